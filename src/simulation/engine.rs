// src/simulation/engine.rs

use crate::io::demand::{generate_populations, DemandModel};
use crate::model::chc::DemandContext;
use crate::model::facility::FacilityId;
use crate::model::medicine::MedicineClass;
use crate::model::topology::Network;
use crate::simulation::config::SimulationConfig;
use crate::simulation::error::SimulationError;
use crate::simulation::metrics::{
    MetricsAggregator, MonthAccumulator, MonthlyRecord, RunParameters, ScenarioRun, ScenarioTotals,
    ShipmentRecord, StockLevels,
};
use crate::simulation::scenario::{ScenarioEvent, ScenarioId, ScenarioSettings, ScenarioState};
use crate::strategy::implementations::{ForecastShare, ServedChcShare};
use crate::strategy::traits::{AllocationContext, AllocationPolicy};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Bernoulli;
use rayon::prelude::*;

/// One scenario run: owns the facility graph, the random stream and the trace.
#[derive(Debug)]
pub struct SupplyChainSimulation {
    /// Configuration with the scenario's overrides applied.
    config: SimulationConfig,
    settings: ScenarioSettings,
    state: ScenarioState,

    network: Network,
    demand: DemandModel,

    central_policy: Box<dyn AllocationPolicy>,
    hospital_policy: Box<dyn AllocationPolicy>,

    absenteeism: Bernoulli,
    rng: StdRng,

    current_month: usize,
    metrics: MetricsAggregator,
}

impl SupplyChainSimulation {
    /// Resolves the scenario and builds a fresh network.
    ///
    /// Random draws happen in a fixed order from a stream seeded with
    /// `config.seed`: CHC populations first, then outbreak CHCs, then monthly
    /// attendance.
    pub fn new(config: &SimulationConfig, scenario: ScenarioId) -> Result<Self, SimulationError> {
        config.validate()?;
        let settings = ScenarioSettings::for_scenario(scenario, config);
        let config = settings.apply_overrides(config);
        settings.validate(&config)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let populations = generate_populations(
            &mut rng,
            config.n_chcs,
            config.population_min,
            config.population_max,
        );
        let network = Network::build(&config, &populations)?;
        let state = ScenarioState::initialize(&settings, network.chcs(), &mut rng);
        let demand = DemandModel::new(config.class_params.clone(), config.demographics.clone())?;
        let absenteeism = Bernoulli::new(config.health_worker_absenteeism)
            .map_err(|e| SimulationError::InvalidConfig(format!("health_worker_absenteeism: {}", e)))?;

        info!(
            "Starting scenario '{}' ({} months, {} CHCs, seed {})",
            scenario, config.n_months, config.n_chcs, config.seed
        );

        Ok(Self {
            central_policy: Box::new(ServedChcShare::new(config.central_release_fraction)),
            hospital_policy: Box::new(ForecastShare::new(config.hospital_release_fraction)),
            config,
            settings,
            state,
            network,
            demand,
            absenteeism,
            rng,
            current_month: 0,
            metrics: MetricsAggregator::new(),
        })
    }

    /// Replaces the allocation rules for central->hospital and hospital->CHC.
    pub fn with_policies(
        mut self,
        central_policy: Box<dyn AllocationPolicy>,
        hospital_policy: Box<dyn AllocationPolicy>,
    ) -> Self {
        self.central_policy = central_policy;
        self.hospital_policy = hospital_policy;
        self
    }

    /// Runs until the configured horizon is reached.
    pub fn run(&mut self) {
        while self.current_month < self.config.n_months {
            self.step();
        }
    }

    /// Advances one month through every stage, in fixed order.
    pub fn step(&mut self) -> &MonthlyRecord {
        self.current_month += 1;
        let month = self.current_month;
        let mut shipments: Vec<ShipmentRecord> = Vec::new();
        let mut month_metrics = MonthAccumulator::new();

        // =================================================================
        // PHASE 1: TRIGGERS & PRODUCTION
        // =================================================================
        self.apply_due_events(month);

        for facility in self.network.facilities_mut() {
            facility.produce(month, self.config.medicine_shelf_life);
        }

        // =================================================================
        // PHASE 2: ARRIVALS
        // Stock landing this month is visible to distribution and demand.
        // =================================================================
        for facility in self.network.facilities_mut() {
            facility.process_incoming_shipments(month);
        }

        // =================================================================
        // PHASE 3: DISTRIBUTION (manufacturer -> central -> hospital -> CHC)
        // =================================================================
        let manufacturers = self.network.manufacturers().to_vec();
        let central_stores = self.network.central_stores().to_vec();
        let hospitals = self.network.hospitals().to_vec();
        let distribution_transit = self.config.distribution_transit_time();

        // Manufacturers push everything they hold.
        for &mfr in &manufacturers {
            for &cms in &central_stores {
                for class in MedicineClass::ALL {
                    let available = self.network[mfr].stock_level(class);
                    if available > 0 {
                        self.network.ship(
                            mfr,
                            cms,
                            class,
                            available,
                            self.config.manufacturer_transit_time,
                            month,
                            &mut shipments,
                        );
                    }
                }
            }
        }

        for &cms in &central_stores {
            distribute(
                &mut self.network,
                self.central_policy.as_ref(),
                &self.demand,
                &self.state,
                cms,
                &hospitals,
                distribution_transit,
                month,
                &mut shipments,
            );
        }

        for &hospital in &hospitals {
            let served = self.network.served_chcs(hospital).to_vec();
            distribute(
                &mut self.network,
                self.hospital_policy.as_ref(),
                &self.demand,
                &self.state,
                hospital,
                &served,
                distribution_transit,
                month,
                &mut shipments,
            );
        }

        // =================================================================
        // PHASE 4: PATIENTS
        // Attendance for every CHC is rolled before any demand is served.
        // =================================================================
        for facility in self.network.facilities_mut() {
            facility.roll_attendance(&self.absenteeism, &mut self.rng);
        }

        let resistance_rate = self.state.resistance_rate();
        for chc in self.network.chcs().to_vec() {
            let ctx = DemandContext {
                month,
                demand: &self.demand,
                outbreak_multiplier: self.state.outbreak_multiplier_for(chc),
                resistance_rate,
                private_sector_diversion: self.state.private_sector_diversion,
                death_rates: &self.config.death_rates,
            };
            let outcome = self.network[chc].resolve_demand(&ctx);
            month_metrics.add_outcome(&outcome);
        }

        // =================================================================
        // PHASE 5: EXPIRY, SNAPSHOT & RECORD
        // Expiry runs after every movement so shipped stock is never also
        // counted as wasted.
        // =================================================================
        for facility in self.network.facilities_mut() {
            month_metrics.add_wastage(&facility.process_expiry(month));
        }

        let record = month_metrics.finish(month, StockLevels::capture(&self.network), shipments);
        debug!(
            "Month {}: shortages {}, deaths {}, wastage {}, treatment rate {:.3}, {} shipments",
            month,
            record.total_shortages(),
            record.total_deaths(),
            record.total_wastage(),
            record.treatment_rate,
            record.shipments.len()
        );
        self.metrics.record(record)
    }

    fn apply_due_events(&mut self, month: usize) {
        for scheduled in self.settings.events.iter().filter(|e| e.is_due(month)) {
            match scheduled.event {
                ScenarioEvent::ManufacturerFailure {
                    manufacturer,
                    recovery_months,
                } => {
                    let id = self.network.manufacturers().get(manufacturer).copied();
                    if let Some(id) = id {
                        self.network[id].fail(month, recovery_months);
                        warn!(
                            "Month {}: {} failed, back in production at month {}",
                            month,
                            self.network[id].name,
                            month + recovery_months
                        );
                    }
                }
                ScenarioEvent::AmrOnset { resistance_rate } => {
                    self.state.activate_amr(resistance_rate);
                    warn!(
                        "Month {}: Penicillin resistance active at rate {:.2}",
                        month, resistance_rate
                    );
                }
            }
        }
    }

    // =====================================================================
    // Accessors
    // =====================================================================

    pub fn scenario(&self) -> ScenarioId {
        self.settings.id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn scenario_state(&self) -> &ScenarioState {
        &self.state
    }

    pub fn current_month(&self) -> usize {
        self.current_month
    }

    pub fn history(&self) -> &[MonthlyRecord] {
        self.metrics.history()
    }

    pub fn totals(&self) -> ScenarioTotals {
        self.metrics.totals()
    }

    /// Consumes the simulation into its exported dataset.
    pub fn into_run(self) -> ScenarioRun {
        let totals = self.metrics.totals();
        ScenarioRun {
            scenario_id: self.settings.id,
            scenario_name: self.settings.id.display_name().to_string(),
            n_months: self.current_month,
            parameters: RunParameters {
                seed: self.config.seed,
                transit_time: self.config.transit_time,
                order_lead_time: self.config.order_lead_time,
            },
            months: self.metrics.into_history(),
            totals,
        }
    }
}

/// Splits `from`'s stock among `recipients` per class and ships it.
///
/// Allocations are computed against the stock held before the first shipment
/// of the class, so every recipient sees the same denominator.
#[allow(clippy::too_many_arguments)]
fn distribute(
    network: &mut Network,
    policy: &dyn AllocationPolicy,
    demand: &DemandModel,
    scenario: &ScenarioState,
    from: FacilityId,
    recipients: &[FacilityId],
    transit_time: usize,
    month: usize,
    log: &mut Vec<ShipmentRecord>,
) {
    for class in MedicineClass::ALL {
        let available = network[from].stock_level(class);
        if available == 0 {
            continue;
        }
        let allocations = {
            let ctx = AllocationContext {
                network: &*network,
                demand,
                scenario,
                month,
            };
            policy.allocate(available, recipients, class, &ctx)
        };
        for (to, quantity) in recipients.iter().zip(allocations) {
            if quantity > 0 {
                network.ship(from, *to, class, quantity, transit_time, month, log);
            }
        }
    }
}

/// Runs one scenario for `n_months` months and returns its dataset.
pub fn run_scenario(
    config: &SimulationConfig,
    scenario: ScenarioId,
    n_months: usize,
) -> Result<ScenarioRun, SimulationError> {
    let mut sim = SupplyChainSimulation::new(config, scenario)?;
    for _ in 0..n_months {
        sim.step();
    }
    let run = sim.into_run();
    info!(
        "Finished scenario '{}': shortages {}, deaths {}, wastage {}",
        run.scenario_id, run.totals.shortages, run.totals.deaths, run.totals.wastage
    );
    Ok(run)
}

/// Runs all eight scenarios over the configured horizon, in parallel.
///
/// Each run builds its own network and seeds its own stream, so results are
/// identical to running them one after another. Output keeps `ScenarioId::ALL`
/// order.
pub fn run_all_scenarios(config: &SimulationConfig) -> Result<Vec<ScenarioRun>, SimulationError> {
    ScenarioId::ALL
        .par_iter()
        .map(|scenario| run_scenario(config, *scenario, config.n_months))
        .collect()
}
