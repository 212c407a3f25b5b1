//! End-to-end behavior of the eight scenarios over the full 60-month horizon.

use antibiotic_supply_sim::{
    run_all_scenarios, run_scenario, MedicineClass, ScenarioId, ScenarioRun, SimulationConfig,
    SimulationError, SupplyChainSimulation,
};

fn full_run(scenario: ScenarioId) -> ScenarioRun {
    let config = SimulationConfig::default();
    run_scenario(&config, scenario, config.n_months).unwrap()
}

fn cumulative_shortages(run: &ScenarioRun) -> Vec<u64> {
    run.months
        .iter()
        .scan(0u64, |total, record| {
            *total += record.total_shortages();
            Some(*total)
        })
        .collect()
}

// =============================================================================
// Manufacturer failure
// =============================================================================

#[test]
fn test_failed_manufacturer_is_offline_for_twelve_months() {
    let run = full_run(ScenarioId::ManufacturerFailure);

    for record in &run.months {
        let mfr = &record.stock_levels.manufacturers[0];
        assert_eq!(mfr.id, "MFR_0");
        let expected = !(12..=23).contains(&record.month);
        assert_eq!(mfr.operational, Some(expected), "month {}", record.month);
        assert_eq!(record.stock_levels.manufacturers[1].operational, Some(true));
    }
}

#[test]
fn test_failed_manufacturer_produces_nothing() {
    let run = full_run(ScenarioId::ManufacturerFailure);

    for record in &run.months {
        let shipped_by_mfr0: u32 = record
            .shipments
            .iter()
            .filter(|s| s.from == "MFR_0")
            .map(|s| s.quantity)
            .sum();
        if (12..=23).contains(&record.month) {
            assert_eq!(shipped_by_mfr0, 0, "month {}", record.month);
            assert_eq!(record.stock_levels.manufacturers[0].stock, 0);
        } else {
            assert!(shipped_by_mfr0 > 0, "month {}", record.month);
        }
    }
}

#[test]
fn test_failure_leaves_earlier_months_untouched() {
    let base = full_run(ScenarioId::Base);
    let failure = full_run(ScenarioId::ManufacturerFailure);

    assert_eq!(base.months[..11], failure.months[..11]);
    assert_ne!(base.months[11], failure.months[11]);
}

// =============================================================================
// Transit delays
// =============================================================================

#[test]
fn test_weather_delays_never_improve_availability() {
    let base = cumulative_shortages(&full_run(ScenarioId::Base));
    let weather = cumulative_shortages(&full_run(ScenarioId::WeatherDelays));

    for (month, (b, w)) in base.iter().zip(&weather).enumerate() {
        assert!(w >= b, "month {}: weather {} < base {}", month + 1, w, b);
    }
}

#[test]
fn test_weather_delays_slow_distribution() {
    let config = SimulationConfig::default();
    let mut sim = SupplyChainSimulation::new(&config, ScenarioId::WeatherDelays).unwrap();
    assert_eq!(sim.config().distribution_transit_time(), 2);

    sim.step();
    let hospital = sim.network().hospitals()[0];
    let in_transit = sim.network()[hospital]
        .incoming()
        .quantity_in_transit(MedicineClass::Penicillins);
    assert!(in_transit > 0);

    // Month-1 shipments from the central store land in month 3, not month 2.
    sim.step();
    let still_in_transit = sim.network()[hospital]
        .incoming()
        .quantity_in_transit(MedicineClass::Penicillins);
    assert!(still_in_transit >= in_transit);
}

// =============================================================================
// Demand-side scenarios
// =============================================================================

#[test]
fn test_outbreak_increases_shortages() {
    let base = full_run(ScenarioId::Base);
    let outbreak = full_run(ScenarioId::DiseaseOutbreak);

    assert!(outbreak.totals.shortages > base.totals.shortages);
}

#[test]
fn test_amr_matches_base_until_onset() {
    let base = full_run(ScenarioId::Base);
    let amr = full_run(ScenarioId::AmrSubstitution);

    assert_eq!(base.months[..23], amr.months[..23]);
    assert_ne!(base.months[23..], amr.months[23..]);
}

#[test]
fn test_private_sector_shrinks_public_demand() {
    let base = full_run(ScenarioId::Base);
    let private = full_run(ScenarioId::PrivateSector);

    for (b, p) in base.months.iter().zip(&private.months) {
        let base_total: u64 = b.patients_total.values().sum();
        let private_total: u64 = p.patients_total.values().sum();
        assert!(private_total < base_total, "month {}", b.month);
    }
}

// =============================================================================
// Invariants over every scenario
// =============================================================================

#[test]
fn test_treatment_rate_is_bounded() {
    let runs = run_all_scenarios(&SimulationConfig::default()).unwrap();

    for run in &runs {
        assert_eq!(run.months.len(), 60);
        for record in &run.months {
            let total: u64 = record.patients_total.values().sum();
            let treated: u64 = record.patients_treated.values().sum();
            assert!(treated <= total);
            if total == 0 {
                assert_eq!(record.treatment_rate, 1.0);
            } else {
                assert!((0.0..=1.0).contains(&record.treatment_rate));
            }
        }
    }
}

#[test]
fn test_no_empty_lots_survive_a_month() {
    for scenario in [ScenarioId::Base, ScenarioId::AmrSubstitution, ScenarioId::PrivateSector] {
        let mut sim = SupplyChainSimulation::new(&SimulationConfig::default(), scenario).unwrap();
        while sim.current_month() < 60 {
            sim.step();
            for facility in sim.network().facilities() {
                for class in MedicineClass::ALL {
                    assert!(
                        facility.lots(class).iter().all(|lot| lot.quantity > 0),
                        "{} holds an empty {} lot in month {}",
                        facility.name,
                        class,
                        sim.current_month()
                    );
                }
            }
        }
    }
}

#[test]
fn test_totals_are_flat_sums() {
    let run = full_run(ScenarioId::Base);

    let shortages: u64 = run.months.iter().map(|r| r.total_shortages()).sum();
    let wastage: u64 = run.months.iter().map(|r| r.total_wastage()).sum();
    assert_eq!(run.totals.shortages, shortages);
    assert_eq!(run.totals.wastage, wastage);
}

#[test]
fn test_unknown_scenario_is_rejected() {
    assert_eq!(
        "volcano_eruption".parse::<ScenarioId>(),
        Err(SimulationError::UnknownScenario("volcano_eruption".to_string()))
    );
}
