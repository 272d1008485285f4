//! HBM3-PIM cycle-accurate simulator CLI.
//!
//! This binary provides a single entry point for trace-driven simulation:
//! 1. **Run:** replay a load/store/PIM trace against a configured device and
//!    print per-run statistics (optionally the full command timeline).
//! 2. **Presets:** list the built-in organization and timing presets.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::{fs, process};

use hbmsim_core::config::Config;
use hbmsim_core::device::{Organization, TimingVals};
use hbmsim_core::{MemorySystem, Simulator, TraceFrontend};

#[derive(Parser, Debug)]
#[command(
    name = "hbmsim",
    version,
    about = "HBM3-PIM cycle-accurate memory system simulator",
    long_about = "Replay a load/store/PIM trace against an HBM3-PIM device model.\n\nConfiguration is JSON (see hbmsim_core::config::Config); the CLI uses built-in defaults when no config file is given.\n\nExamples:\n  hbmsim run --trace traces/gemv.trace\n  hbmsim run --trace traces/gemv.trace --config configs/hbm3_8gb.json --timeline\n  hbmsim presets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print statistics.
    Run {
        /// Trace file (`<OP> <addr>` per line).
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON configuration file (defaults used when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the cycle timeline of every issued command.
        #[arg(long)]
        timeline: bool,
    },

    /// List the built-in organization and timing presets.
    Presets,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            trace,
            config,
            timeline,
        } => cmd_run(&trace, config.as_deref(), timeline),
        Commands::Presets => cmd_presets(),
    }
}

/// Runs the simulator: loads config and trace, loops on `tick` until the
/// trace drains, then prints statistics (and the timeline when requested).
fn cmd_run(trace: &std::path::Path, config_path: Option<&std::path::Path>, timeline: bool) {
    let mut config: Config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {e}", path.display());
                process::exit(1);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {}: {e}", path.display());
                process::exit(1);
            })
        }
        None => Config::default(),
    };
    config.general.log_commands |= timeline;

    let memory = MemorySystem::new(&config).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        process::exit(1);
    });
    let frontend = TraceFrontend::from_path(trace).unwrap_or_else(|e| {
        eprintln!("Trace error: {e}");
        process::exit(1);
    });

    println!(
        "Configuration: org={} timing={} mapper={:?} tCK={:.3} ns clock_ratio={}",
        config.device.org.preset,
        config.device.timing.preset.as_deref().unwrap_or("(rate)"),
        config.general.mapper,
        memory.tck_ns(),
        memory.clock_ratio(),
    );
    println!("[*] Trace: {} ({} lines)", trace.display(), frontend.len());

    let mut sim = Simulator::new(frontend, memory);
    let cycles = sim.run();

    if timeline {
        println!();
        println!("cycle      command  addr_vec");
        for record in sim.memory.device_mut().take_command_log() {
            println!(
                "{:<10} {:<8} {:?}",
                record.cycle, record.command, record.addr_vec
            );
        }
    }

    println!("\n[*] Finished in {cycles} cycles");
    sim.memory.stats().print();
}

/// Prints the built-in preset names.
fn cmd_presets() {
    println!("Organization presets:");
    for name in Organization::preset_names() {
        println!("  {name}");
    }
    println!("Timing presets:");
    for name in TimingVals::preset_names() {
        println!("  {name}");
    }
}
