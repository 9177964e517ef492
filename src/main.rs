//! HAProxy configuration synthesizer.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings.toml + env ──┐
//!                         ▼
//!   topology file ──▶ ┌──────────┐    ┌──────────┐    ┌──────────┐
//!   (watcher,         │ topology │───▶│ compiler │───▶│ detector │
//!    SIGHUP, timer)   └──────────┘    └──────────┘    └────┬─────┘
//!                                                          │ changed
//!                                                          ▼
//!                                     ┌──────────┐    ┌──────────┐
//!                          HAProxy ◀──│  reload  │◀───│ storage  │
//!                                     └──────────┘    └──────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use haproxy_synth::compiler::compile;
use haproxy_synth::lifecycle::{startup, Daemon, Shutdown, SynthesisState};
use haproxy_synth::observability::{logging, metrics};
use haproxy_synth::reload::HaproxyProcess;
use haproxy_synth::storage::FsStore;

#[derive(Parser)]
#[command(name = "haproxy-synth")]
#[command(about = "Synthesize HAProxy configuration from a service topology", long_about = None)]
struct Cli {
    /// Settings file (TOML). Environment variables override it.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the topology, then keep watching it and reload on change
    Run {
        /// Topology file (TOML, or JSON by extension)
        #[arg(short, long)]
        topology: PathBuf,
    },
    /// Print the configuration for a topology and exit
    Render {
        #[arg(short, long)]
        topology: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { topology, format } => {
            let loaded = startup::load(cli.settings.as_deref(), &topology)?;
            let compiled = compile(&loaded.settings, &loaded.topology);
            match format {
                Format::Text => println!("{}", compiled.text()),
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(compiled.document.sections())?
                ),
            }
        }
        Commands::Run { topology } => {
            let settings = startup::settings(cli.settings.as_deref())?;
            logging::init(&settings.observability);

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "haproxy-synth starting");
            let initial = startup::topology(&topology)?;

            if settings.observability.metrics_enabled {
                match settings.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %settings.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let state = SynthesisState::new(Box::new(HaproxyProcess::new(
                settings.reload.command.clone(),
            )));
            let store = Box::new(FsStore::new(&settings.paths));
            let daemon = Daemon::new(
                settings,
                initial,
                topology,
                state,
                store,
                Shutdown::new(),
            );
            daemon.run().await?;

            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
