// src/strategy/traits.rs

use crate::io::demand::DemandModel;
use crate::model::facility::FacilityId;
use crate::model::medicine::MedicineClass;
use crate::model::topology::Network;
use crate::simulation::scenario::ScenarioState;
use std::fmt::Debug;

/// Read-only view of the run that allocation policies may consult.
#[derive(Debug, Clone, Copy)]
pub struct AllocationContext<'a> {
    pub network: &'a Network,
    pub demand: &'a DemandModel,
    pub scenario: &'a ScenarioState,
    pub month: usize,
}

/// Decides how an upstream facility splits its stock among recipients.
///
/// We require `Send` + `Sync` so whole simulations can move to worker threads.
pub trait AllocationPolicy: Debug + Send + Sync {
    /// One non-negative weight per recipient, in recipient order.
    fn claims(
        &self,
        recipients: &[FacilityId],
        class: MedicineClass,
        ctx: &AllocationContext<'_>,
    ) -> Vec<u64>;

    /// Share of available stock released per cycle, in [0, 1].
    fn release_fraction(&self) -> f64;

    /// Quantity to ship to each recipient:
    /// `floor(available * (claim / total_claims) * release_fraction)`.
    ///
    /// A zero claim total allocates nothing.
    fn allocate(
        &self,
        available: u32,
        recipients: &[FacilityId],
        class: MedicineClass,
        ctx: &AllocationContext<'_>,
    ) -> Vec<u32> {
        let claims = self.claims(recipients, class, ctx);
        let total: u64 = claims.iter().sum();
        if total == 0 || available == 0 {
            return vec![0; recipients.len()];
        }
        let fraction = self.release_fraction();
        claims
            .iter()
            .map(|claim| (available as f64 * (*claim as f64 / total as f64) * fraction) as u32)
            .collect()
    }
}
