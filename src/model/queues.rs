// src/model/queues.rs

use crate::model::medicine::{LotStatus, MedicineClass, MedicineLot};
use serde::{Deserialize, Serialize};

/// One leg of a shipment, as it appears in a month's shipment trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub from: String,
    pub to: String,
    pub medicine_type: MedicineClass,
    pub quantity: u32,
}

/// Lots on their way to a facility, each tagged with the month it lands.
///
/// Unlike a fixed-length delay pipe, transit time varies per shipment
/// (scenario overrides, different tiers), so every entry carries its own
/// arrival month.
#[derive(Debug, Clone, Default)]
pub struct ShipmentQueue {
    in_transit: Vec<(usize, MedicineLot)>,
}

impl ShipmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items enter the pipeline.
    pub fn push(&mut self, arrival_month: usize, mut lot: MedicineLot) {
        lot.status = LotStatus::InTransit;
        self.in_transit.push((arrival_month, lot));
    }

    /// Removes and returns every lot whose arrival month has come.
    /// Lots still travelling stay queued.
    pub fn take_arrived(&mut self, current_month: usize) -> Vec<MedicineLot> {
        let (arrived, pending): (Vec<_>, Vec<_>) = self
            .in_transit
            .drain(..)
            .partition(|(arrival_month, _)| *arrival_month <= current_month);
        self.in_transit = pending;
        arrived.into_iter().map(|(_, lot)| lot).collect()
    }

    /// Units of `class` currently in transit to this facility.
    pub fn quantity_in_transit(&self, class: MedicineClass) -> u32 {
        self.in_transit
            .iter()
            .filter(|(_, lot)| lot.class == class)
            .map(|(_, lot)| lot.quantity)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.in_transit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_transit.is_empty()
    }
}
