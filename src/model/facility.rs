// src/model/facility.rs

use crate::model::medicine::{self, per_age, per_class, ByAge, ByClass, LotStatus, MedicineClass, MedicineLot};
use crate::model::queues::{ShipmentQueue, ShipmentRecord};
use log::trace;
use std::collections::BTreeMap;
use std::fmt;

/// Manufacturer output split across classes.
pub const PRODUCTION_SPLIT: [(MedicineClass, f64); 3] = [
    (MedicineClass::Penicillins, 0.60),
    (MedicineClass::Macrolides, 0.30),
    (MedicineClass::Fluoroquinolones, 0.10),
];

/// Index of a facility inside the network. Roles refer to each other only
/// through these ids, never through references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacilityId(pub usize);

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tier of the supply hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityKind {
    Manufacturer,
    CentralStore,
    Hospital,
    Chc,
}

#[derive(Debug, Clone)]
pub struct ManufacturerState {
    pub operational: bool,
    pub recovery_month: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct HospitalState {
    pub served_chcs: Vec<FacilityId>,
}

/// Community health center state: the patient-facing end of the chain.
#[derive(Debug, Clone)]
pub struct ChcState {
    pub population_served: u32,
    pub hospital: FacilityId,
    pub health_worker_present: bool,

    // Cumulative counters over the run
    pub patients_treated: ByAge<u64>,
    pub patients_untreated: ByAge<u64>,
    pub deaths: ByAge<u64>,
    pub shortages: ByClass<u64>,
}

impl ChcState {
    pub fn new(population_served: u32, hospital: FacilityId) -> Self {
        Self {
            population_served,
            hospital,
            health_worker_present: true,
            patients_treated: per_age(),
            patients_untreated: per_age(),
            deaths: per_age(),
            shortages: per_class(),
        }
    }
}

/// Role tag plus the state only that role carries.
#[derive(Debug, Clone)]
pub enum FacilityRole {
    Manufacturer(ManufacturerState),
    CentralStore,
    Hospital(HospitalState),
    Chc(ChcState),
}

impl FacilityRole {
    pub fn manufacturer() -> Self {
        FacilityRole::Manufacturer(ManufacturerState {
            operational: true,
            recovery_month: None,
        })
    }

    pub fn hospital() -> Self {
        FacilityRole::Hospital(HospitalState {
            served_chcs: Vec::new(),
        })
    }

    pub fn kind(&self) -> FacilityKind {
        match self {
            FacilityRole::Manufacturer(_) => FacilityKind::Manufacturer,
            FacilityRole::CentralStore => FacilityKind::CentralStore,
            FacilityRole::Hospital(_) => FacilityKind::Hospital,
            FacilityRole::Chc(_) => FacilityKind::Chc,
        }
    }
}

/// A node of the supply chain: owns its lots and its incoming shipments.
///
/// Shipping, arrivals, expiry and stock queries are shared by every role;
/// production and demand resolution dispatch on `role`.
#[derive(Debug, Clone)]
pub struct Facility {
    // Identity
    pub id: FacilityId,
    pub name: String,
    /// Soft ceiling, only used for display and ratio metrics.
    pub capacity: u32,
    pub role: FacilityRole,

    inventory: BTreeMap<MedicineClass, Vec<MedicineLot>>,
    incoming: ShipmentQueue,
    total_expired: ByClass<u64>,
}

impl Facility {
    pub fn new(id: FacilityId, name: impl Into<String>, capacity: u32, role: FacilityRole) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            role,
            inventory: BTreeMap::new(),
            incoming: ShipmentQueue::new(),
            total_expired: per_class(),
        }
    }

    pub fn kind(&self) -> FacilityKind {
        self.role.kind()
    }

    // =====================================================================
    // Stock queries
    // =====================================================================

    pub fn stock_level(&self, class: MedicineClass) -> u32 {
        self.inventory
            .get(&class)
            .map(|lots| medicine::available(lots))
            .unwrap_or(0)
    }

    pub fn total_stock(&self) -> u32 {
        MedicineClass::ALL.iter().map(|c| self.stock_level(*c)).sum()
    }

    pub fn lots(&self, class: MedicineClass) -> &[MedicineLot] {
        self.inventory.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self) -> &ShipmentQueue {
        &self.incoming
    }

    /// Units lost to expiry since the start of the run.
    pub fn total_expired(&self) -> &ByClass<u64> {
        &self.total_expired
    }

    // =====================================================================
    // Inventory movements
    // =====================================================================

    /// Puts a lot on the shelf.
    pub fn receive(&mut self, mut lot: MedicineLot) {
        if lot.is_empty() {
            return;
        }
        lot.status = LotStatus::InStock;
        self.inventory.entry(lot.class).or_default().push(lot);
    }

    /// Draws up to `quantity` units FEFO and hands them out to patients.
    /// The returned portions are marked `Dispensed`.
    pub fn dispense(&mut self, class: MedicineClass, quantity: u32) -> Vec<MedicineLot> {
        if quantity == 0 {
            return Vec::new();
        }
        let Some(lots) = self.inventory.get_mut(&class) else {
            return Vec::new();
        };
        let mut portions = medicine::draw_fefo(lots, quantity);
        for portion in &mut portions {
            portion.status = LotStatus::Dispensed;
        }
        portions
    }

    /// Dispenses up to `quantity` units. Returns the amount actually dispensed.
    pub fn consume(&mut self, class: MedicineClass, quantity: u32) -> u32 {
        self.dispense(class, quantity)
            .iter()
            .map(|portion| portion.quantity)
            .sum()
    }

    /// Ships up to `quantity` units of `class` to `destination`.
    ///
    /// Stock is drawn FEFO; each drawn portion travels as its own lot and lands
    /// in the destination's incoming queue at `current_month + transit_time`.
    /// Never fails: if stock is short the shipment is simply smaller.
    /// Returns the quantity shipped; non-zero shipments are appended to `log`.
    pub fn ship_to(
        &mut self,
        destination: &mut Facility,
        class: MedicineClass,
        quantity: u32,
        transit_time: usize,
        current_month: usize,
        log: &mut Vec<ShipmentRecord>,
    ) -> u32 {
        let Some(lots) = self.inventory.get_mut(&class) else {
            return 0;
        };

        let arrival_month = current_month + transit_time;
        let mut shipped = 0;
        for portion in medicine::draw_fefo(lots, quantity) {
            shipped += portion.quantity;
            destination.incoming.push(arrival_month, portion);
        }

        if shipped > 0 {
            trace!(
                "month {}: {} -> {} {} x{} (arrives month {})",
                current_month,
                self.name,
                destination.name,
                class,
                shipped,
                arrival_month
            );
            log.push(ShipmentRecord {
                from: self.name.clone(),
                to: destination.name.clone(),
                medicine_type: class,
                quantity: shipped,
            });
        }
        shipped
    }

    /// Moves every shipment that has arrived into inventory.
    /// Returns the number of units received.
    pub fn process_incoming_shipments(&mut self, current_month: usize) -> u32 {
        let mut received = 0;
        for lot in self.incoming.take_arrived(current_month) {
            received += lot.quantity;
            self.receive(lot);
        }
        received
    }

    /// Removes expired lots and returns the wasted quantity per class.
    pub fn process_expiry(&mut self, current_month: usize) -> ByClass<u32> {
        let mut expired: ByClass<u32> = BTreeMap::new();
        for (class, lots) in self.inventory.iter_mut() {
            let wasted: u32 = medicine::remove_expired(lots, current_month)
                .iter()
                .map(|lot| lot.quantity)
                .sum();
            if wasted > 0 {
                expired.insert(*class, wasted);
                *self.total_expired.entry(*class).or_default() += wasted as u64;
            }
        }
        expired
    }

    // =====================================================================
    // Manufacturer behavior
    // =====================================================================

    pub fn is_operational(&self) -> Option<bool> {
        match &self.role {
            FacilityRole::Manufacturer(state) => Some(state.operational),
            _ => None,
        }
    }

    /// Runs one month of production.
    ///
    /// A failed manufacturer whose recovery month has come is switched back on
    /// first and then produces in the same call. Non-manufacturers and
    /// manufacturers still down produce nothing (empty map).
    pub fn produce(&mut self, current_month: usize, shelf_life: usize) -> ByClass<u32> {
        let mut produced = BTreeMap::new();

        let FacilityRole::Manufacturer(state) = &mut self.role else {
            return produced;
        };
        if !state.operational {
            match state.recovery_month {
                Some(month) if current_month >= month => {
                    state.operational = true;
                    state.recovery_month = None;
                }
                _ => return produced,
            }
        }

        for (class, share) in PRODUCTION_SPLIT {
            let quantity = (self.capacity as f64 * share) as u32;
            self.receive(MedicineLot::new(class, quantity, current_month, shelf_life));
            produced.insert(class, quantity);
        }
        produced
    }

    /// Takes a manufacturer offline until `current_month + recovery_months`.
    /// Returns false (and does nothing) for other roles.
    pub fn fail(&mut self, current_month: usize, recovery_months: usize) -> bool {
        match &mut self.role {
            FacilityRole::Manufacturer(state) => {
                state.operational = false;
                state.recovery_month = Some(current_month + recovery_months);
                true
            }
            _ => false,
        }
    }

    // =====================================================================
    // Role accessors
    // =====================================================================

    pub fn served_chcs(&self) -> &[FacilityId] {
        match &self.role {
            FacilityRole::Hospital(state) => &state.served_chcs,
            _ => &[],
        }
    }

    pub fn chc(&self) -> Option<&ChcState> {
        match &self.role {
            FacilityRole::Chc(state) => Some(state),
            _ => None,
        }
    }

    pub fn chc_mut(&mut self) -> Option<&mut ChcState> {
        match &mut self.role {
            FacilityRole::Chc(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> Facility {
        Facility::new(FacilityId(0), name, 1000, FacilityRole::CentralStore)
    }

    #[test]
    fn test_ship_to_conserves_stock() {
        let mut source = store("CMS_0");
        let mut dest = Facility::new(FacilityId(1), "HOSP_0", 500, FacilityRole::hospital());
        source.receive(MedicineLot::new(MedicineClass::Penicillins, 40, 0, 12));
        source.receive(MedicineLot::new(MedicineClass::Penicillins, 25, 2, 12));
        let mut log = Vec::new();

        let before = source.stock_level(MedicineClass::Penicillins);
        let shipped = source.ship_to(&mut dest, MedicineClass::Penicillins, 50, 2, 5, &mut log);

        assert_eq!(shipped, 50);
        assert_eq!(source.stock_level(MedicineClass::Penicillins), before - shipped);
        assert_eq!(dest.stock_level(MedicineClass::Penicillins), 0, "still in transit");
        assert_eq!(dest.incoming().quantity_in_transit(MedicineClass::Penicillins), 50);
        assert_eq!(
            log,
            vec![ShipmentRecord {
                from: "CMS_0".to_string(),
                to: "HOSP_0".to_string(),
                medicine_type: MedicineClass::Penicillins,
                quantity: 50,
            }]
        );

        assert_eq!(dest.process_incoming_shipments(6), 0);
        assert_eq!(dest.process_incoming_shipments(7), 50);
        assert_eq!(dest.stock_level(MedicineClass::Penicillins), 50);
    }

    #[test]
    fn test_short_shipment_is_not_an_error() {
        let mut source = store("CMS_0");
        let mut dest = store("CMS_1");
        source.receive(MedicineLot::new(MedicineClass::Macrolides, 8, 0, 12));
        let mut log = Vec::new();

        let shipped = source.ship_to(&mut dest, MedicineClass::Macrolides, 20, 1, 1, &mut log);

        assert_eq!(shipped, 8);
        assert_eq!(source.stock_level(MedicineClass::Macrolides), 0);
        assert!(source.lots(MedicineClass::Macrolides).is_empty());
    }

    #[test]
    fn test_empty_shipment_is_not_logged() {
        let mut source = store("CMS_0");
        let mut dest = store("CMS_1");
        let mut log = Vec::new();

        let shipped = source.ship_to(&mut dest, MedicineClass::Fluoroquinolones, 20, 1, 1, &mut log);

        assert_eq!(shipped, 0);
        assert!(log.is_empty());
        assert!(dest.incoming().is_empty());
    }

    #[test]
    fn test_shipped_lots_keep_expiry() {
        let mut source = store("CMS_0");
        let mut dest = store("CMS_1");
        source.receive(MedicineLot::new(MedicineClass::Penicillins, 10, 3, 12));
        let mut log = Vec::new();

        source.ship_to(&mut dest, MedicineClass::Penicillins, 10, 1, 4, &mut log);
        dest.process_incoming_shipments(5);

        assert_eq!(dest.lots(MedicineClass::Penicillins)[0].expiry_month, 15);
        assert_eq!(dest.lots(MedicineClass::Penicillins)[0].status, LotStatus::InStock);
    }

    #[test]
    fn test_expiry_tallies_waste() {
        let mut facility = store("CMS_0");
        facility.receive(MedicineLot::new(MedicineClass::Penicillins, 10, 0, 12));
        facility.receive(MedicineLot::new(MedicineClass::Penicillins, 7, 5, 12));
        facility.receive(MedicineLot::new(MedicineClass::Macrolides, 3, 0, 12));

        assert!(facility.process_expiry(11).is_empty());

        let wasted = facility.process_expiry(12);
        assert_eq!(wasted.get(&MedicineClass::Penicillins), Some(&10));
        assert_eq!(wasted.get(&MedicineClass::Macrolides), Some(&3));
        assert_eq!(facility.stock_level(MedicineClass::Penicillins), 7);
        assert_eq!(facility.total_expired()[&MedicineClass::Penicillins], 10);
    }

    #[test]
    fn test_consume_dispenses_fefo() {
        let mut chc = store("CHC_001");
        chc.receive(MedicineLot::new(MedicineClass::Penicillins, 10, 4, 12));
        chc.receive(MedicineLot::new(MedicineClass::Penicillins, 10, 1, 12));

        assert_eq!(chc.consume(MedicineClass::Penicillins, 12), 12);

        let lots = chc.lots(MedicineClass::Penicillins);
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].manufacture_month, 4);
        assert_eq!(lots[0].quantity, 8);
    }

    #[test]
    fn test_dispensed_portions_leave_the_shelf_marked() {
        let mut chc = store("CHC_002");
        chc.receive(MedicineLot::new(MedicineClass::Macrolides, 5, 2, 12));
        chc.receive(MedicineLot::new(MedicineClass::Macrolides, 5, 3, 12));

        let portions = chc.dispense(MedicineClass::Macrolides, 7);

        assert_eq!(portions.iter().map(|p| p.quantity).collect::<Vec<_>>(), vec![5, 2]);
        assert!(portions.iter().all(|p| p.status == LotStatus::Dispensed));
        assert!(chc.lots(MedicineClass::Macrolides).iter().all(|l| l.status == LotStatus::InStock));
        assert_eq!(chc.stock_level(MedicineClass::Macrolides), 3);
    }

    #[test]
    fn test_production_split() {
        let mut mfr = Facility::new(FacilityId(0), "MFR_0", 50_000, FacilityRole::manufacturer());

        let produced = mfr.produce(1, 12);

        assert_eq!(produced[&MedicineClass::Penicillins], 30_000);
        assert_eq!(produced[&MedicineClass::Macrolides], 15_000);
        assert_eq!(produced[&MedicineClass::Fluoroquinolones], 5_000);
        assert_eq!(mfr.total_stock(), 50_000);
        assert_eq!(mfr.lots(MedicineClass::Penicillins)[0].expiry_month, 13);
    }

    #[test]
    fn test_failed_manufacturer_recovers_and_produces_same_month() {
        let mut mfr = Facility::new(FacilityId(0), "MFR_0", 1_000, FacilityRole::manufacturer());

        assert!(mfr.fail(12, 12));
        assert_eq!(mfr.is_operational(), Some(false));

        for month in 12..24 {
            assert!(mfr.produce(month, 12).is_empty(), "month {} should be idle", month);
        }
        assert_eq!(mfr.total_stock(), 0);

        let produced = mfr.produce(24, 12);
        assert_eq!(mfr.is_operational(), Some(true));
        assert_eq!(produced.values().sum::<u32>(), 1_000);
    }

    #[test]
    fn test_non_manufacturer_cannot_fail_or_produce() {
        let mut hospital = Facility::new(FacilityId(3), "HOSP_0", 100, FacilityRole::hospital());
        assert!(!hospital.fail(1, 1));
        assert!(hospital.produce(1, 12).is_empty());
        assert_eq!(hospital.is_operational(), None);
    }
}
