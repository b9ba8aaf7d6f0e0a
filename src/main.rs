use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use clap::Parser;
use vcachesim::config::CacheConfig;
use vcachesim::io::read_trace;
use vcachesim::simulator::Simulator;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Trace-driven simulator for an L1 cache with an optional victim cache"))]
struct Args {
    config: String,
    trace: String,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    let config_file = File::open(&args.config)
        .map_err(|e| format!("Couldn't open the config file at path {}: {e}", args.config))?;
    let config: CacheConfig = serde_json::from_reader(BufReader::new(config_file))
        .map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    let mut simulator =
        Simulator::new(&config).map_err(|e| format!("Invalid cache configuration: {e}"))?;
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        print!("{}", simulator.l1());
        if let Some(victim) = simulator.victim() {
            print!("{victim}");
        }
    }
    let trace_file = File::open(&args.trace)
        .map_err(|e| format!("Couldn't open the trace file at path {}: {e}", args.trace))?;
    let trace = read_trace(trace_file)?;
    simulator.simulate(&trace).map_err(|e| e.to_string())?;
    let simulation_time = *simulator.get_execution_time();
    if args.debug {
        let formatted = simulator
            .uninitialised_line_counts()
            .iter()
            .map(|(level, count)| format!("{level}: {count}"))
            .reduce(|a, b| format!("{a}, {b}"))
            .unwrap_or_default();
        println!("Uninitialised cache lines by level: ({formatted})");
    }
    let stats = simulator.finalize();
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).map_err(|e| format!("Couldn't serialise the output {e}"))?
    );
    if args.performance {
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!(
            "Total execution time (includes initial parsing, configuration, and output): {}s",
            total_time.as_nanos() as f64 / 1e9
        )
    }
    Ok(())
}
