// src/simulation/metrics.rs

use crate::model::chc::DemandOutcome;
use crate::model::facility::FacilityId;
use crate::model::medicine::{per_age, per_class, ByAge, ByClass};
use crate::model::topology::Network;
use crate::simulation::scenario::ScenarioId;
use serde::{Deserialize, Serialize};

pub use crate::model::queues::ShipmentRecord;

/// Stock of one manufacturer, central store or hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStock {
    pub id: String,
    pub stock: u32,
    pub capacity: u32,
    /// Only reported for manufacturers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational: Option<bool>,
}

/// CHCs served by one hospital, summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStock {
    pub id: String,
    pub stock: u64,
    pub capacity: u64,
    pub num_chcs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub manufacturers: Vec<NodeStock>,
    pub central_stores: Vec<NodeStock>,
    pub hospitals: Vec<NodeStock>,
    pub chc_regions: Vec<RegionStock>,
}

impl StockLevels {
    /// End-of-month snapshot. CHCs are grouped into one region per hospital.
    pub fn capture(network: &Network) -> Self {
        let node = |id: FacilityId| {
            let facility = &network[id];
            NodeStock {
                id: facility.name.clone(),
                stock: facility.total_stock(),
                capacity: facility.capacity,
                operational: facility.is_operational(),
            }
        };

        let chc_regions = network
            .hospitals()
            .iter()
            .enumerate()
            .map(|(i, hospital)| {
                let served = network.served_chcs(*hospital);
                RegionStock {
                    id: format!("CHC_Region_{}", i),
                    stock: served.iter().map(|c| network[*c].total_stock() as u64).sum(),
                    capacity: served.iter().map(|c| network[*c].capacity as u64).sum(),
                    num_chcs: served.len(),
                }
            })
            .collect();

        Self {
            manufacturers: network.manufacturers().iter().copied().map(node).collect(),
            central_stores: network.central_stores().iter().copied().map(node).collect(),
            hospitals: network.hospitals().iter().copied().map(node).collect(),
            chc_regions,
        }
    }

    /// Stock held by tier, in tier order.
    pub fn tier_totals(&self) -> [u64; 4] {
        let sum = |nodes: &[NodeStock]| -> u64 { nodes.iter().map(|n| n.stock as u64).sum() };
        [
            sum(&self.manufacturers),
            sum(&self.central_stores),
            sum(&self.hospitals),
            self.chc_regions.iter().map(|r| r.stock).sum(),
        ]
    }
}

/// Everything observed in one month. Never changes once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub month: usize,
    pub stock_levels: StockLevels,
    pub shipments: Vec<ShipmentRecord>,
    pub shortages: ByClass<u64>,
    pub wastage: ByClass<u64>,
    pub deaths: ByAge<u64>,
    pub patients_treated: ByAge<u64>,
    /// Treated plus untreated; demand diverted to the private sector is not counted.
    pub patients_total: ByAge<u64>,
    pub treatment_rate: f64,
}

impl MonthlyRecord {
    pub fn total_shortages(&self) -> u64 {
        self.shortages.values().sum()
    }

    pub fn total_deaths(&self) -> u64 {
        self.deaths.values().sum()
    }

    pub fn total_wastage(&self) -> u64 {
        self.wastage.values().sum()
    }

    pub fn shipped_units(&self) -> u64 {
        self.shipments.iter().map(|s| s.quantity as u64).sum()
    }
}

/// treated / total, or 1.0 when nobody was considered.
pub fn treatment_rate(treated: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        treated as f64 / total as f64
    }
}

/// Collects one month's counters while the stages run.
#[derive(Debug, Clone)]
pub struct MonthAccumulator {
    shortages: ByClass<u64>,
    wastage: ByClass<u64>,
    deaths: ByAge<u64>,
    patients_treated: ByAge<u64>,
    patients_total: ByAge<u64>,
}

impl Default for MonthAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthAccumulator {
    pub fn new() -> Self {
        Self {
            shortages: per_class(),
            wastage: per_class(),
            deaths: per_age(),
            patients_treated: per_age(),
            patients_total: per_age(),
        }
    }

    pub fn add_outcome(&mut self, outcome: &DemandOutcome) {
        for (age, treated) in &outcome.treated {
            let untreated = outcome.untreated.get(age).copied().unwrap_or(0);
            *self.patients_treated.entry(*age).or_default() += *treated as u64;
            *self.patients_total.entry(*age).or_default() += (*treated + untreated) as u64;
        }
        for (age, deaths) in &outcome.deaths {
            *self.deaths.entry(*age).or_default() += *deaths as u64;
        }
        for (class, shortage) in &outcome.shortages {
            *self.shortages.entry(*class).or_default() += *shortage as u64;
        }
    }

    pub fn add_wastage(&mut self, expired: &ByClass<u32>) {
        for (class, quantity) in expired {
            *self.wastage.entry(*class).or_default() += *quantity as u64;
        }
    }

    pub fn finish(self, month: usize, stock_levels: StockLevels, shipments: Vec<ShipmentRecord>) -> MonthlyRecord {
        let treated: u64 = self.patients_treated.values().sum();
        let total: u64 = self.patients_total.values().sum();
        MonthlyRecord {
            month,
            stock_levels,
            shipments,
            shortages: self.shortages,
            wastage: self.wastage,
            deaths: self.deaths,
            patients_treated: self.patients_treated,
            patients_total: self.patients_total,
            treatment_rate: treatment_rate(treated, total),
        }
    }
}

/// Flat sums over every recorded month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioTotals {
    pub shortages: u64,
    pub deaths: u64,
    pub wastage: u64,
}

/// Append-only monthly history with running totals.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    history: Vec<MonthlyRecord>,
    totals: ScenarioTotals,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: MonthlyRecord) -> &MonthlyRecord {
        self.totals.shortages += record.total_shortages();
        self.totals.deaths += record.total_deaths();
        self.totals.wastage += record.total_wastage();
        self.history.push(record);
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[MonthlyRecord] {
        &self.history
    }

    pub fn totals(&self) -> ScenarioTotals {
        self.totals
    }

    pub fn into_history(self) -> Vec<MonthlyRecord> {
        self.history
    }
}

/// Run parameters after scenario overrides, kept alongside the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
    pub seed: u64,
    pub transit_time: usize,
    pub order_lead_time: usize,
}

/// The exported dataset of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub scenario_id: ScenarioId,
    pub scenario_name: String,
    pub n_months: usize,
    pub parameters: RunParameters,
    pub months: Vec<MonthlyRecord>,
    pub totals: ScenarioTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::medicine::{AgeGroup, MedicineClass};
    use crate::simulation::config::SimulationConfig;

    fn empty_levels() -> StockLevels {
        StockLevels {
            manufacturers: Vec::new(),
            central_stores: Vec::new(),
            hospitals: Vec::new(),
            chc_regions: Vec::new(),
        }
    }

    #[test]
    fn test_treatment_rate_without_patients_is_one() {
        assert_eq!(treatment_rate(0, 0), 1.0);
        assert_eq!(treatment_rate(3, 4), 0.75);
    }

    #[test]
    fn test_empty_month_has_every_key() {
        let record = MonthAccumulator::new().finish(1, empty_levels(), Vec::new());

        assert_eq!(record.shortages.len(), 3);
        assert_eq!(record.deaths.len(), 3);
        assert_eq!(record.treatment_rate, 1.0);
    }

    #[test]
    fn test_aggregator_sums_months() {
        let mut aggregator = MetricsAggregator::new();
        for month in 1..=3 {
            let mut acc = MonthAccumulator::new();
            acc.add_wastage(&[(MedicineClass::Macrolides, 10)].into_iter().collect());
            let mut record = acc.finish(month, empty_levels(), Vec::new());
            record.shortages.insert(MedicineClass::Penicillins, 5);
            record.deaths.insert(AgeGroup::Elderly, 1);
            aggregator.record(record);
        }

        assert_eq!(
            aggregator.totals(),
            ScenarioTotals {
                shortages: 15,
                deaths: 3,
                wastage: 30
            }
        );
        assert_eq!(aggregator.history().len(), 3);
    }

    #[test]
    fn test_snapshot_groups_chcs_by_hospital() {
        let config = SimulationConfig {
            n_chcs: 7,
            ..Default::default()
        };
        let network = Network::build(&config, &[10_000; 7]).unwrap();

        let levels = StockLevels::capture(&network);

        assert_eq!(levels.manufacturers[0].operational, Some(true));
        assert_eq!(levels.hospitals[0].operational, None);
        assert_eq!(levels.chc_regions[0].id, "CHC_Region_0");
        assert_eq!(levels.chc_regions[0].num_chcs, 3);
        assert_eq!(levels.chc_regions[0].stock, 3 * 999);
        assert_eq!(levels.chc_regions[1].capacity, 2 * 2_000);
    }

    #[test]
    fn test_operational_flag_only_serialized_for_manufacturers() {
        let node = NodeStock {
            id: "HOSP_0".to_string(),
            stock: 1,
            capacity: 2,
            operational: None,
        };
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("operational"));
    }
}
