// src/io/demand.rs

use crate::model::medicine::{AgeGroup, ByAge, ByClass, MedicineClass};
use crate::simulation::error::SimulationError;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Seasonal demand curve for one antibiotic class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassParams {
    /// Monthly prescriptions per 1000 people before seasonality and trend.
    pub base_demand_per_1000: f64,
    /// Relative swing of the sine curve (0.3 = +/-30%).
    pub seasonal_amplitude: f64,
    /// Month of year (1-12) the sine curve is anchored on.
    pub peak_month: u32,
    /// Yearly linear growth rate.
    pub trend: f64,
}

impl ClassParams {
    /// Checks one class's curve; `class` only labels the error.
    pub fn validate(&self, class: MedicineClass) -> Result<(), SimulationError> {
        let non_negative = [
            ("base_demand_per_1000", self.base_demand_per_1000),
            ("seasonal_amplitude", self.seasonal_amplitude),
            ("trend", self.trend),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} {} must be non-negative, got {}",
                    class, name, value
                )));
            }
        }
        if !(1..=12).contains(&self.peak_month) {
            return Err(SimulationError::InvalidConfig(format!(
                "{} peak month must be 1-12, got {}",
                class, self.peak_month
            )));
        }
        Ok(())
    }
}

/// Default curves for the three classes.
pub fn default_class_params() -> ByClass<ClassParams> {
    [
        (
            MedicineClass::Penicillins,
            ClassParams {
                base_demand_per_1000: 15.0,
                seasonal_amplitude: 0.3,
                peak_month: 1,
                trend: 0.02,
            },
        ),
        (
            MedicineClass::Macrolides,
            ClassParams {
                base_demand_per_1000: 8.0,
                seasonal_amplitude: 0.4,
                peak_month: 12,
                trend: 0.03,
            },
        ),
        (
            MedicineClass::Fluoroquinolones,
            ClassParams {
                base_demand_per_1000: 4.0,
                seasonal_amplitude: 0.1,
                peak_month: 7,
                trend: 0.01,
            },
        ),
    ]
    .into_iter()
    .collect()
}

/// Generates expected monthly demand per facility and class.
///
/// The same forecast drives both hospital allocation and CHC demand, so the
/// model is shared by the whole run and never mutated.
#[derive(Debug, Clone)]
pub struct DemandModel {
    params: ByClass<ClassParams>,
    demographics: ByAge<f64>,
}

impl DemandModel {
    /// Fails unless every class has a valid curve.
    pub fn new(params: ByClass<ClassParams>, demographics: ByAge<f64>) -> Result<Self, SimulationError> {
        for class in MedicineClass::ALL {
            let class_params = params.get(&class).ok_or_else(|| {
                SimulationError::InvalidConfig(format!("missing demand parameters for {}", class))
            })?;
            class_params.validate(class)?;
        }
        Ok(Self { params, demographics })
    }

    /// Expected demand for `population` in simulation month `month` (1-based).
    ///
    /// # Formula
    /// demand = base * (pop/1000) * (1 + amplitude * sin(2pi(moy - peak)/12))
    ///          * (1 + trend * years_elapsed) * outbreak_multiplier
    ///
    /// floored, never below 1.
    pub fn forecast(
        &self,
        population: u32,
        month: usize,
        class: MedicineClass,
        outbreak_multiplier: f64,
    ) -> u32 {
        // Every class is present: checked in `new`.
        let Some(params) = self.params.get(&class) else {
            return 1;
        };

        let elapsed = month.saturating_sub(1);
        let year = elapsed / 12 + 1;
        let month_of_year = elapsed % 12 + 1;

        let base = params.base_demand_per_1000 * (population as f64 / 1000.0);
        let seasonal = params.seasonal_amplitude
            * (2.0 * PI * (month_of_year as f64 - params.peak_month as f64) / 12.0).sin();
        let years_from_start = (year - 1) as f64 + (month_of_year - 1) as f64 / 12.0;
        let trend = 1.0 + params.trend * years_from_start;

        let demand = base * (1.0 + seasonal) * trend * outbreak_multiplier;
        demand.max(1.0) as u32
    }

    /// Splits a class total across age groups by demographic share (floored).
    pub fn split_by_age(&self, total: u32) -> ByAge<u32> {
        AgeGroup::ALL
            .iter()
            .map(|age| {
                let share = self.demographics.get(age).copied().unwrap_or(0.0);
                (*age, (total as f64 * share) as u32)
            })
            .collect()
    }
}

/// Draws `count` catchment populations uniformly from `min..=max`.
pub fn generate_populations<R: Rng + ?Sized>(rng: &mut R, count: usize, min: u32, max: u32) -> Vec<u32> {
    let range = Uniform::new_inclusive(min, max);
    (0..count).map(|_| range.sample(rng)).collect()
}
