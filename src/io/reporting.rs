// src/io/reporting.rs

use crate::simulation::metrics::{ScenarioRun, ScenarioTotals};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub totals: ScenarioTotals,
}

/// Flat per-month row for spreadsheet use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummaryRow {
    pub month: usize,
    pub shortages: u64,
    pub deaths: u64,
    pub wastage: u64,
    pub treatment_rate: f64,
    pub shipments: usize,
    pub units_shipped: u64,
    pub manufacturer_stock: u64,
    pub central_store_stock: u64,
    pub hospital_stock: u64,
    pub chc_stock: u64,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Writes `<dir>/<scenario_id>.json` and returns its path.
pub fn write_scenario_json(dir: &Path, run: &ScenarioRun) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("{}.json", run.scenario_id));
    write_json(&path, run)?;
    info!("Exported {} months to '{}'", run.months.len(), path.display());
    Ok(path)
}

/// Maps every scenario id to its display name and totals.
pub fn build_index(runs: &[ScenarioRun]) -> BTreeMap<String, IndexEntry> {
    runs.iter()
        .map(|run| {
            (
                run.scenario_id.to_string(),
                IndexEntry {
                    name: run.scenario_name.clone(),
                    totals: run.totals,
                },
            )
        })
        .collect()
}

/// Writes `<dir>/index.json` and returns its path.
pub fn write_index(dir: &Path, runs: &[ScenarioRun]) -> Result<PathBuf, ReportError> {
    let path = dir.join("index.json");
    write_json(&path, &build_index(runs))?;
    Ok(path)
}

pub fn summary_rows(run: &ScenarioRun) -> Vec<MonthlySummaryRow> {
    run.months
        .iter()
        .map(|record| {
            let [manufacturer_stock, central_store_stock, hospital_stock, chc_stock] =
                record.stock_levels.tier_totals();
            MonthlySummaryRow {
                month: record.month,
                shortages: record.total_shortages(),
                deaths: record.total_deaths(),
                wastage: record.total_wastage(),
                treatment_rate: record.treatment_rate,
                shipments: record.shipments.len(),
                units_shipped: record.shipped_units(),
                manufacturer_stock,
                central_store_stock,
                hospital_stock,
                chc_stock,
            }
        })
        .collect()
}

/// Writes one CSV row per month.
pub fn write_monthly_csv(path: &Path, run: &ScenarioRun) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in summary_rows(run) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every scenario's JSON and CSV plus the index into `dir`,
/// creating it if needed. Returns the paths written.
pub fn export_dataset(dir: &Path, runs: &[ScenarioRun]) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(runs.len() * 2 + 1);
    for run in runs {
        written.push(write_scenario_json(dir, run)?);
        let csv_path = dir.join(format!("{}.csv", run.scenario_id));
        write_monthly_csv(&csv_path, run)?;
        written.push(csv_path);
    }
    written.push(write_index(dir, runs)?);
    info!("Wrote {} files to '{}'", written.len(), dir.display());
    Ok(written)
}
