//! Command-line runner for SimpleScript scenarios.

mod commands;
mod scenario;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ss",
    about = "SimpleScript: run tick-driven entity scripts headless",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log interpreter activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario for a number of ticks
    Run {
        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Script root containing entity/, item/ and behavior/ directories
        #[arg(long, default_value = ".")]
        scripts: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value = "10")]
        ticks: u64,

        /// Statements each script may evaluate per tick
        #[arg(short, long)]
        budget: Option<usize>,

        /// Print the world event log
        #[arg(short, long)]
        events: bool,

        /// Only show events involving this entity id
        #[arg(long, value_name = "ID", requires = "events")]
        event_entity: Option<u32>,

        /// Only show events from this tick
        #[arg(long, value_name = "TICK", requires = "events")]
        event_tick: Option<u64>,
    },

    /// List the entity and item functions found under a script root
    Functions {
        /// Script root containing entity/ and item/ directories
        #[arg(long, default_value = ".")]
        scripts: PathBuf,
    },

    /// Check script files for block and variable syntax errors
    Check {
        /// Script files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn install_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            scenario,
            scripts,
            ticks,
            budget,
            events,
            event_entity,
            event_tick,
        } => {
            let events = events.then_some(commands::run::EventFilter {
                entity: event_entity.map(ss_world::EntityId),
                tick: event_tick,
            });
            commands::run::run(&scenario, &scripts, ticks, budget, events)
        }
        Commands::Functions { scripts } => commands::functions::run(&scripts),
        Commands::Check { files } => commands::check::run(&files),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
