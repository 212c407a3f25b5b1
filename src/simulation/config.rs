// src/simulation/config.rs

use crate::io::demand::{default_class_params, ClassParams};
use crate::model::medicine::{AgeGroup, ByAge, ByClass, MedicineClass};
use crate::simulation::error::SimulationError;
use serde::{Deserialize, Serialize};

/// Everything a run needs besides the scenario choice.
///
/// Treated as immutable once a run starts; scenario overrides are applied to
/// a copy at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Topology
    pub n_manufacturers: usize,
    pub n_central_stores: usize,
    pub n_hospitals: usize,
    pub n_chcs: usize,

    // Horizon and timing
    pub n_months: usize,
    pub transit_time: usize,
    pub order_lead_time: usize,
    /// Transit from a manufacturer to the central store, independent of scenario.
    pub manufacturer_transit_time: usize,
    pub medicine_shelf_life: usize,

    // Patients
    pub health_worker_absenteeism: f64,
    pub death_rates: ByAge<f64>,
    pub demographics: ByAge<f64>,
    pub population_min: u32,
    pub population_max: u32,
    pub class_params: ByClass<ClassParams>,

    // Capacities
    pub manufacturer_capacity: u32,
    pub central_store_capacity: u32,
    pub hospital_capacity: u32,
    pub chc_capacity: u32,
    pub initial_stock_pct: f64,

    // Allocation
    pub central_release_fraction: f64,
    pub hospital_release_fraction: f64,

    // Scenario knobs
    pub outbreak_size: usize,
    pub outbreak_multiplier: f64,

    /// Seed for the run's single random stream.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_manufacturers: 2,
            n_central_stores: 1,
            n_hospitals: 3,
            n_chcs: 100,
            n_months: 60,
            transit_time: 2,
            order_lead_time: 2,
            manufacturer_transit_time: 1,
            medicine_shelf_life: 12,
            health_worker_absenteeism: 0.10,
            death_rates: [
                (AgeGroup::Child, 0.05),
                (AgeGroup::Adult, 0.02),
                (AgeGroup::Elderly, 0.08),
            ]
            .into_iter()
            .collect(),
            demographics: [
                (AgeGroup::Child, 0.35),
                (AgeGroup::Adult, 0.55),
                (AgeGroup::Elderly, 0.10),
            ]
            .into_iter()
            .collect(),
            population_min: 5_000,
            population_max: 50_000,
            class_params: default_class_params(),
            manufacturer_capacity: 50_000,
            central_store_capacity: 100_000,
            hospital_capacity: 20_000,
            chc_capacity: 2_000,
            initial_stock_pct: 0.5,
            central_release_fraction: 0.8,
            hospital_release_fraction: 0.9,
            outbreak_size: 25,
            outbreak_multiplier: 3.0,
            seed: 42,
        }
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), SimulationError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(SimulationError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Transit time used for central->hospital and hospital->CHC legs.
    pub fn distribution_transit_time(&self) -> usize {
        self.transit_time / 2
    }

    /// Rejects configurations that would produce a misleading trace.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let counts = [
            ("n_manufacturers", self.n_manufacturers),
            ("n_central_stores", self.n_central_stores),
            ("n_hospitals", self.n_hospitals),
            ("n_chcs", self.n_chcs),
            ("n_months", self.n_months),
            ("medicine_shelf_life", self.medicine_shelf_life),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(SimulationError::InvalidConfig(format!("{} must be > 0", name)));
            }
        }

        if self.population_min > self.population_max {
            return Err(SimulationError::InvalidConfig(format!(
                "population range is empty: {}..={}",
                self.population_min, self.population_max
            )));
        }

        check_rate("health_worker_absenteeism", self.health_worker_absenteeism)?;
        check_rate("initial_stock_pct", self.initial_stock_pct)?;
        check_rate("central_release_fraction", self.central_release_fraction)?;
        check_rate("hospital_release_fraction", self.hospital_release_fraction)?;
        for age in AgeGroup::ALL {
            let death_rate = self.death_rates.get(&age).copied().ok_or_else(|| {
                SimulationError::InvalidConfig(format!("missing death rate for {}", age))
            })?;
            check_rate(&format!("death_rates.{}", age), death_rate)?;
            let share = self.demographics.get(&age).copied().ok_or_else(|| {
                SimulationError::InvalidConfig(format!("missing demographic share for {}", age))
            })?;
            check_rate(&format!("demographics.{}", age), share)?;
        }

        for class in MedicineClass::ALL {
            let params = self.class_params.get(&class).ok_or_else(|| {
                SimulationError::InvalidConfig(format!("missing demand parameters for {}", class))
            })?;
            params.validate(class)?;
        }

        if !(self.outbreak_multiplier.is_finite() && self.outbreak_multiplier >= 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "outbreak_multiplier must be non-negative, got {}",
                self.outbreak_multiplier
            )));
        }

        Ok(())
    }
}
