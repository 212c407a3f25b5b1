// src/strategy/implementations.rs

use crate::model::facility::FacilityId;
use crate::model::medicine::MedicineClass;
use crate::strategy::traits::{AllocationContext, AllocationPolicy};

// =========================================================================
// 1. Served-CHC Share (Central Store -> Hospitals)
// =========================================================================

/// Splits stock by how many CHCs each hospital serves, ignoring demand.
#[derive(Debug, Clone)]
pub struct ServedChcShare {
    release_fraction: f64,
}

impl ServedChcShare {
    pub fn new(release_fraction: f64) -> Self {
        Self { release_fraction }
    }
}

impl Default for ServedChcShare {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl AllocationPolicy for ServedChcShare {
    fn claims(
        &self,
        recipients: &[FacilityId],
        _class: MedicineClass,
        ctx: &AllocationContext<'_>,
    ) -> Vec<u64> {
        recipients
            .iter()
            .map(|hospital| ctx.network.served_chcs(*hospital).len() as u64)
            .collect()
    }

    fn release_fraction(&self) -> f64 {
        self.release_fraction
    }
}

// =========================================================================
// 2. Forecast Share (Hospital -> CHCs)
// =========================================================================

/// Splits stock by each CHC's forecast demand for the month, outbreak
/// multiplier included. Recipients that are not CHCs claim nothing.
#[derive(Debug, Clone)]
pub struct ForecastShare {
    release_fraction: f64,
}

impl ForecastShare {
    pub fn new(release_fraction: f64) -> Self {
        Self { release_fraction }
    }
}

impl Default for ForecastShare {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl AllocationPolicy for ForecastShare {
    fn claims(
        &self,
        recipients: &[FacilityId],
        class: MedicineClass,
        ctx: &AllocationContext<'_>,
    ) -> Vec<u64> {
        recipients
            .iter()
            .map(|id| match ctx.network[*id].chc() {
                Some(chc) => ctx.demand.forecast(
                    chc.population_served,
                    ctx.month,
                    class,
                    ctx.scenario.outbreak_multiplier_for(*id),
                ) as u64,
                None => 0,
            })
            .collect()
    }

    fn release_fraction(&self) -> f64 {
        self.release_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::demand::DemandModel;
    use crate::model::topology::Network;
    use crate::simulation::config::SimulationConfig;
    use crate::simulation::scenario::{ScenarioId, ScenarioSettings, ScenarioState};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    /// 4 CHCs over 3 hospitals: HOSP_0 serves CHC_001 and CHC_004.
    fn fixture(scenario: ScenarioId) -> (Network, DemandModel, ScenarioState) {
        let config = SimulationConfig {
            n_chcs: 4,
            ..Default::default()
        };
        let network = Network::build(&config, &[10_000, 20_000, 20_000, 30_000]).unwrap();
        let demand = DemandModel::new(config.class_params.clone(), config.demographics.clone()).unwrap();
        let settings = ScenarioSettings::for_scenario(scenario, &config);
        let state = ScenarioState::initialize(&settings, network.chcs(), &mut StdRng::seed_from_u64(0));
        (network, demand, state)
    }

    #[test]
    fn test_served_chc_share() {
        let (network, demand, state) = fixture(ScenarioId::Base);
        let ctx = AllocationContext {
            network: &network,
            demand: &demand,
            scenario: &state,
            month: 1,
        };
        let policy = ServedChcShare::default();

        let allocation = policy.allocate(1_000, network.hospitals(), MedicineClass::Penicillins, &ctx);

        // shares 2/4, 1/4, 1/4 of 80%
        assert_eq!(allocation, vec![400, 200, 200]);
    }

    #[test]
    fn test_forecast_share() {
        let (network, demand, state) = fixture(ScenarioId::Base);
        let ctx = AllocationContext {
            network: &network,
            demand: &demand,
            scenario: &state,
            month: 1,
        };
        let hospital = network.hospitals()[0];
        let policy = ForecastShare::default();

        // forecasts 150 and 450 at the Penicillin peak month
        let allocation = policy.allocate(
            1_000,
            network.served_chcs(hospital),
            MedicineClass::Penicillins,
            &ctx,
        );

        assert_eq!(allocation, vec![225, 675]);
    }

    #[test]
    fn test_outbreak_raises_forecast_claim() {
        let (network, demand, mut state) = fixture(ScenarioId::Base);
        let hospital = network.hospitals()[0];
        let served = network.served_chcs(hospital).to_vec();
        state.outbreak_chcs = BTreeSet::from([served[0]]);
        state.outbreak_multiplier = 3.0;
        let ctx = AllocationContext {
            network: &network,
            demand: &demand,
            scenario: &state,
            month: 1,
        };

        let claims = ForecastShare::default().claims(&served, MedicineClass::Penicillins, &ctx);

        assert_eq!(claims, vec![450, 450]);
    }

    #[test]
    fn test_nothing_available_allocates_nothing() {
        let (network, demand, state) = fixture(ScenarioId::Base);
        let ctx = AllocationContext {
            network: &network,
            demand: &demand,
            scenario: &state,
            month: 1,
        };

        let allocation = ServedChcShare::default().allocate(0, network.hospitals(), MedicineClass::Macrolides, &ctx);
        assert_eq!(allocation, vec![0, 0, 0]);

        let no_chcs: Vec<FacilityId> = network.hospitals().to_vec();
        let allocation = ForecastShare::default().allocate(500, &no_chcs, MedicineClass::Macrolides, &ctx);
        assert_eq!(allocation, vec![0, 0, 0]);
    }
}
