// src/simulation/error.rs

use thiserror::Error;

/// Conditions that must stop a run before it produces a trace.
///
/// Short stock and empty denominators are not errors; they are absorbed by
/// the stage that meets them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
}
