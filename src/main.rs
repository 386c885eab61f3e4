//! Command-line runner for the scheduling simulator.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use schedsim::cases::TestCase;
use schedsim::event::TracingSink;
use schedsim::scheduler::Scheduler;

#[derive(Parser, Debug)]
#[command(name = "schedsim")]
#[command(about = "Simulate task scheduling across multi-datacenter compute", long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = TestCase::Random)]
    case: TestCase,

    /// Override the scenario's default run length in days
    #[arg(short, long)]
    days: Option<u32>,

    /// Seed for all randomness in the run
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Output JSON file path for the run report (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut setup = match args.case.set_up(&mut rng) {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("Failed to set up scenario: {e}");
            std::process::exit(1);
        }
    };
    if let Some(days) = args.days {
        setup.num_days = days;
    }

    let mut scheduler = Scheduler::new(setup, TracingSink, &mut rng);
    let report = match scheduler.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Run aborted: {e}");
            std::process::exit(1);
        }
    };

    let json = serde_json::to_string_pretty(&report).expect("report serializes to JSON");
    println!("{json}");

    if let Some(output_path) = args.output {
        fs::write(&output_path, &json).expect("Failed to write JSON output");
        println!("Report saved to {}", output_path.display());
    }
}
