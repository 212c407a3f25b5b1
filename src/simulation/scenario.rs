// src/simulation/scenario.rs

use crate::model::facility::FacilityId;
use crate::simulation::config::SimulationConfig;
use crate::simulation::error::SimulationError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The eight operating scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    Base,
    WeatherDelays,
    DiseaseOutbreak,
    AdvanceOrdering,
    ManufacturerFailure,
    OptimizationChallenge,
    AmrSubstitution,
    PrivateSector,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 8] = [
        ScenarioId::Base,
        ScenarioId::WeatherDelays,
        ScenarioId::DiseaseOutbreak,
        ScenarioId::AdvanceOrdering,
        ScenarioId::ManufacturerFailure,
        ScenarioId::OptimizationChallenge,
        ScenarioId::AmrSubstitution,
        ScenarioId::PrivateSector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioId::Base => "base",
            ScenarioId::WeatherDelays => "weather_delays",
            ScenarioId::DiseaseOutbreak => "disease_outbreak",
            ScenarioId::AdvanceOrdering => "advance_ordering",
            ScenarioId::ManufacturerFailure => "manufacturer_failure",
            ScenarioId::OptimizationChallenge => "optimization_challenge",
            ScenarioId::AmrSubstitution => "amr_substitution",
            ScenarioId::PrivateSector => "private_sector",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ScenarioId::Base => "Base Case",
            ScenarioId::WeatherDelays => "Weather Delays",
            ScenarioId::DiseaseOutbreak => "Disease Outbreak",
            ScenarioId::AdvanceOrdering => "Advance Ordering",
            ScenarioId::ManufacturerFailure => "Manufacturer Failure",
            ScenarioId::OptimizationChallenge => "Optimized Policy",
            ScenarioId::AmrSubstitution => "AMR Substitution",
            ScenarioId::PrivateSector => "Private Sector",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| SimulationError::UnknownScenario(s.to_string()))
    }
}

/// Something that happens to the running simulation at a given month.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEvent {
    /// Manufacturer (by index among manufacturers) goes offline.
    ManufacturerFailure {
        manufacturer: usize,
        recovery_months: usize,
    },

    /// Penicillin resistance appears; stays active for the rest of the run.
    AmrOnset { resistance_rate: f64 },
}

/// A scenario event paired with the month it fires.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub month: usize,
    pub event: ScenarioEvent,
}

impl ScheduledEvent {
    pub fn is_due(&self, month: usize) -> bool {
        self.month == month
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutbreakSettings {
    /// Number of CHCs hit, drawn at run start.
    pub size: usize,
    pub multiplier: f64,
}

/// Static description of a scenario: parameter overrides plus timed events.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    pub id: ScenarioId,
    pub transit_time: Option<usize>,
    pub order_lead_time: Option<usize>,
    pub outbreak: Option<OutbreakSettings>,
    pub private_sector_diversion: f64,
    pub events: Vec<ScheduledEvent>,
}

impl ScenarioSettings {
    pub fn for_scenario(id: ScenarioId, config: &SimulationConfig) -> Self {
        let mut settings = Self {
            id,
            transit_time: None,
            order_lead_time: None,
            outbreak: None,
            private_sector_diversion: 0.0,
            events: Vec::new(),
        };

        match id {
            ScenarioId::Base => {}
            ScenarioId::WeatherDelays => settings.transit_time = Some(4),
            ScenarioId::DiseaseOutbreak => {
                settings.outbreak = Some(OutbreakSettings {
                    size: config.outbreak_size,
                    multiplier: config.outbreak_multiplier,
                });
            }
            ScenarioId::AdvanceOrdering => settings.order_lead_time = Some(4),
            ScenarioId::ManufacturerFailure => settings.events.push(ScheduledEvent {
                month: 12,
                event: ScenarioEvent::ManufacturerFailure {
                    manufacturer: 0,
                    recovery_months: 12,
                },
            }),
            ScenarioId::OptimizationChallenge => {
                settings.order_lead_time = Some(3);
                settings.transit_time = Some(2);
            }
            ScenarioId::AmrSubstitution => settings.events.push(ScheduledEvent {
                month: 24,
                event: ScenarioEvent::AmrOnset {
                    resistance_rate: 0.30,
                },
            }),
            ScenarioId::PrivateSector => settings.private_sector_diversion = 0.25,
        }
        settings
    }

    /// The run configuration: `config` with this scenario's overrides applied.
    pub fn apply_overrides(&self, config: &SimulationConfig) -> SimulationConfig {
        let mut resolved = config.clone();
        if let Some(transit_time) = self.transit_time {
            resolved.transit_time = transit_time;
        }
        if let Some(order_lead_time) = self.order_lead_time {
            resolved.order_lead_time = order_lead_time;
        }
        resolved
    }

    pub fn validate(&self, config: &SimulationConfig) -> Result<(), SimulationError> {
        if !(0.0..=1.0).contains(&self.private_sector_diversion) {
            return Err(SimulationError::InvalidConfig(format!(
                "private sector diversion must be within [0, 1], got {}",
                self.private_sector_diversion
            )));
        }
        if let Some(outbreak) = &self.outbreak {
            if outbreak.size > config.n_chcs {
                return Err(SimulationError::InvalidConfig(format!(
                    "outbreak size {} exceeds {} CHCs",
                    outbreak.size, config.n_chcs
                )));
            }
            if !(outbreak.multiplier.is_finite() && outbreak.multiplier >= 0.0) {
                return Err(SimulationError::InvalidConfig(format!(
                    "outbreak multiplier must be non-negative, got {}",
                    outbreak.multiplier
                )));
            }
        }
        for scheduled in &self.events {
            if scheduled.month == 0 {
                return Err(SimulationError::InvalidConfig(
                    "scenario events are scheduled from month 1".to_string(),
                ));
            }
            match scheduled.event {
                ScenarioEvent::ManufacturerFailure { manufacturer, .. } => {
                    if manufacturer >= config.n_manufacturers {
                        return Err(SimulationError::InvalidTopology(format!(
                            "failure scheduled for manufacturer {} but only {} exist",
                            manufacturer, config.n_manufacturers
                        )));
                    }
                }
                ScenarioEvent::AmrOnset { resistance_rate } => {
                    if !(0.0..=1.0).contains(&resistance_rate) {
                        return Err(SimulationError::InvalidConfig(format!(
                            "resistance rate must be within [0, 1], got {}",
                            resistance_rate
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Scenario state that varies while the run steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioState {
    pub outbreak_chcs: BTreeSet<FacilityId>,
    pub outbreak_multiplier: f64,
    pub amr_active: bool,
    pub amr_resistance_rate: f64,
    pub private_sector_diversion: f64,
}

impl ScenarioState {
    /// Resolves everything that is fixed for the run, drawing the outbreak
    /// CHCs from the run's random stream.
    pub fn initialize<R: Rng + ?Sized>(settings: &ScenarioSettings, chcs: &[FacilityId], rng: &mut R) -> Self {
        let (outbreak_chcs, outbreak_multiplier) = match &settings.outbreak {
            Some(outbreak) => (
                chcs.choose_multiple(rng, outbreak.size).copied().collect(),
                outbreak.multiplier,
            ),
            None => (BTreeSet::new(), 1.0),
        };

        Self {
            outbreak_chcs,
            outbreak_multiplier,
            amr_active: false,
            amr_resistance_rate: 0.0,
            private_sector_diversion: settings.private_sector_diversion,
        }
    }

    pub fn outbreak_multiplier_for(&self, chc: FacilityId) -> f64 {
        if self.outbreak_chcs.contains(&chc) {
            self.outbreak_multiplier
        } else {
            1.0
        }
    }

    pub fn activate_amr(&mut self, resistance_rate: f64) {
        self.amr_active = true;
        self.amr_resistance_rate = resistance_rate;
    }

    /// Resistance rate while AMR is active.
    pub fn resistance_rate(&self) -> Option<f64> {
        self.amr_active.then_some(self.amr_resistance_rate)
    }
}
