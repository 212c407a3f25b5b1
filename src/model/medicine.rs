// src/model/medicine.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Antibiotic classes moving through the supply chain.
///
/// The declaration order is the fixed processing order used by every stage
/// (production, distribution, demand resolution, reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MedicineClass {
    Penicillins,
    Macrolides,
    Fluoroquinolones,
}

impl MedicineClass {
    pub const ALL: [MedicineClass; 3] = [
        MedicineClass::Penicillins,
        MedicineClass::Macrolides,
        MedicineClass::Fluoroquinolones,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MedicineClass::Penicillins => "Penicillins",
            MedicineClass::Macrolides => "Macrolides",
            MedicineClass::Fluoroquinolones => "Fluoroquinolones",
        }
    }
}

impl fmt::Display for MedicineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Patient age groups. Declaration order is the service order at a CHC:
/// children draw from the shared pool first, then adults, then the elderly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Adult,
    Elderly,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Child, AgeGroup::Adult, AgeGroup::Elderly];

    pub fn name(&self) -> &'static str {
        match self {
            AgeGroup::Child => "child",
            AgeGroup::Adult => "adult",
            AgeGroup::Elderly => "elderly",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-class tally. A BTreeMap keeps iteration (and serialization) order stable.
pub type ByClass<T> = BTreeMap<MedicineClass, T>;

/// Per-age-group tally.
pub type ByAge<T> = BTreeMap<AgeGroup, T>;

/// A tally with every class present and set to the default value.
pub fn per_class<T: Default>() -> ByClass<T> {
    MedicineClass::ALL.iter().map(|c| (*c, T::default())).collect()
}

/// A tally with every age group present and set to the default value.
pub fn per_age<T: Default>() -> ByAge<T> {
    AgeGroup::ALL.iter().map(|a| (*a, T::default())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    InTransit,
    InStock,
    Dispensed,
    Expired,
}

/// A batch of one medicine class manufactured together.
///
/// The expiry window is fixed at creation; only the quantity and the status
/// change over the lot's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineLot {
    pub class: MedicineClass,
    pub quantity: u32,
    pub manufacture_month: usize,
    pub expiry_month: usize,
    pub status: LotStatus,
}

impl MedicineLot {
    pub fn new(class: MedicineClass, quantity: u32, manufacture_month: usize, shelf_life: usize) -> Self {
        Self {
            class,
            quantity,
            manufacture_month,
            expiry_month: manufacture_month + shelf_life,
            status: LotStatus::InStock,
        }
    }

    pub fn shelf_life(&self) -> usize {
        self.expiry_month - self.manufacture_month
    }

    /// Moves up to `quantity` units out of this lot into a new lot with the
    /// same manufacture/expiry window.
    pub fn split(&mut self, quantity: u32) -> MedicineLot {
        let take = quantity.min(self.quantity);
        self.quantity -= take;
        MedicineLot {
            class: self.class,
            quantity: take,
            manufacture_month: self.manufacture_month,
            expiry_month: self.expiry_month,
            status: self.status,
        }
    }

    pub fn is_expired(&self, current_month: usize) -> bool {
        current_month >= self.expiry_month
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}

/// Units of in-stock quantity across `lots`.
pub fn available(lots: &[MedicineLot]) -> u32 {
    lots.iter()
        .filter(|lot| lot.status == LotStatus::InStock)
        .map(|lot| lot.quantity)
        .sum()
}

/// Draws up to `quantity` units from `lots`, soonest-to-expire first (FEFO).
///
/// Returns one portion per source lot touched; the sum of their quantities is
/// the amount actually drawn. Lots left empty are pruned from `lots`.
/// This is the only stock-draw order in the system: shipping and dispensing
/// both go through here.
pub fn draw_fefo(lots: &mut Vec<MedicineLot>, quantity: u32) -> Vec<MedicineLot> {
    // Stable sort: lots sharing an expiry month keep their arrival order.
    lots.sort_by_key(|lot| lot.expiry_month);

    let mut drawn = Vec::new();
    let mut remaining = quantity;
    for lot in lots.iter_mut() {
        if remaining == 0 {
            break;
        }
        if lot.status != LotStatus::InStock || lot.is_empty() {
            continue;
        }
        let portion = lot.split(remaining);
        remaining -= portion.quantity;
        drawn.push(portion);
    }

    lots.retain(|lot| !lot.is_empty());
    drawn
}

/// Takes every lot past its expiry out of `lots`, marked `Expired`.
pub fn remove_expired(lots: &mut Vec<MedicineLot>, current_month: usize) -> Vec<MedicineLot> {
    let mut expired = Vec::new();
    lots.retain(|lot| {
        if lot.is_expired(current_month) {
            expired.push(MedicineLot {
                status: LotStatus::Expired,
                ..lot.clone()
            });
            false
        } else {
            true
        }
    });
    expired
}
