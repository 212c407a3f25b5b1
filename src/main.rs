use antibiotic_supply_sim::{export_dataset, run_all_scenarios, SimulationConfig};
use std::env;
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("{}", "=".repeat(60));
    println!("Pre-computing antibiotic supply chain scenarios");
    println!("{}", "=".repeat(60));

    // 1. SETUP CONFIGURATION
    // Usage: precompute [output_dir] [seed]
    let args: Vec<String> = env::args().skip(1).collect();
    let output_dir = PathBuf::from(args.first().map(String::as_str).unwrap_or("scenarios"));
    let mut config = SimulationConfig::default();
    if let Some(seed) = args.get(1) {
        match seed.parse() {
            Ok(seed) => config.seed = seed,
            Err(e) => {
                eprintln!("Invalid seed '{}': {}", seed, e);
                process::exit(2);
            }
        }
    }

    // 2. RUN ALL SCENARIOS
    let runs = match run_all_scenarios(&config) {
        Ok(runs) => runs,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            process::exit(1);
        }
    };

    // 3. EXPORT RESULTS
    if let Err(e) = export_dataset(&output_dir, &runs) {
        eprintln!("Error writing dataset: {}", e);
        process::exit(1);
    }

    // 4. PRINT TOTALS
    for run in &runs {
        println!("\n{} ({})", run.scenario_name, run.scenario_id);
        println!("  Total shortages: {}", run.totals.shortages);
        println!("  Total deaths:    {}", run.totals.deaths);
        println!("  Total wastage:   {}", run.totals.wastage);
    }

    println!("{}", "=".repeat(60));
    println!("All scenarios exported to {}", output_dir.display());
    println!("{}", "=".repeat(60));
}
