//! Antibiotic supply-chain simulation engine.
//!
//! Monthly agent-based model of antibiotic stock flowing from manufacturers
//! through a central medical store and regional hospitals to community health
//! centers (CHCs), where it meets seasonal patient demand.
//!
//! # Architecture
//!
//! - **model**: lots, facilities, CHC demand resolution, network topology
//! - **strategy**: allocation policies for the distribution tiers
//! - **io**: demand forecasting and dataset export
//! - **simulation**: config, scenarios, monthly orchestrator, metrics
//!
//! # Invariants
//!
//! 1. Every stock draw is First-Expire-First-Out
//! 2. Lots at zero quantity are pruned immediately
//! 3. All randomness comes from one seeded stream per run, so identical
//!    seeds give identical traces

pub mod io;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use io::demand::DemandModel;
pub use io::reporting::{export_dataset, ReportError};
pub use model::facility::{Facility, FacilityId, FacilityKind, FacilityRole};
pub use model::medicine::{AgeGroup, LotStatus, MedicineClass, MedicineLot};
pub use model::topology::Network;
pub use simulation::config::SimulationConfig;
pub use simulation::engine::{run_all_scenarios, run_scenario, SupplyChainSimulation};
pub use simulation::error::SimulationError;
pub use simulation::metrics::{MonthlyRecord, ScenarioRun, ScenarioTotals, ShipmentRecord};
pub use simulation::scenario::ScenarioId;
pub use strategy::traits::AllocationPolicy;
