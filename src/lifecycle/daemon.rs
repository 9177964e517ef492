//! Daemon loop.
//!
//! # Triggers
//! ```text
//! topology file changed (watcher)  → cycle with the new topology
//! SIGHUP                           → re-read topology file, cycle
//! resync timer (optional)          → re-read topology file, cycle
//! shutdown                         → leave the loop
//! ```
//!
//! Cycles run one at a time inside `block_in_place`: the reload call
//! blocks and state is only ever touched by this loop.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};

use crate::config::watcher::TopologyWatcher;
use crate::config::Settings;
use crate::lifecycle::cycle::run_cycle;
use crate::lifecycle::state::SynthesisState;
use crate::lifecycle::{signals, Shutdown};
use crate::storage::ArtifactStore;
use crate::topology::{load_topology, Topology};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("failed to watch topology file: {0}")]
    Watch(#[from] notify::Error),
}

pub struct Daemon {
    settings: Settings,
    topology: Topology,
    topology_path: PathBuf,
    state: SynthesisState,
    store: Box<dyn ArtifactStore + Send + Sync>,
    shutdown: Shutdown,
}

impl Daemon {
    pub fn new(
        settings: Settings,
        topology: Topology,
        topology_path: PathBuf,
        state: SynthesisState,
        store: Box<dyn ArtifactStore + Send + Sync>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            settings,
            topology,
            topology_path,
            state,
            store,
            shutdown,
        }
    }

    /// Run until shutdown. Requires the multi-threaded runtime.
    pub async fn run(mut self) -> Result<SynthesisState, DaemonError> {
        let mut shutdown_rx = self.shutdown.subscribe();

        let (watcher, mut topology_rx) = TopologyWatcher::new(&self.topology_path);
        let _watcher = watcher.run()?;

        let (resync_tx, mut resync_rx) = mpsc::unbounded_channel();
        let signal_task = signals::spawn(self.shutdown.clone(), resync_tx);

        let mut resync = resync_interval(self.settings.daemon.resync_interval_secs);

        self.cycle();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown requested, leaving daemon loop");
                    break;
                }
                Some(topology) = topology_rx.recv() => {
                    self.topology = topology;
                    self.cycle();
                }
                Some(()) = resync_rx.recv() => {
                    self.reload_topology();
                    self.cycle();
                }
                _ = tick(&mut resync) => {
                    tracing::debug!("Periodic resync");
                    self.reload_topology();
                    self.cycle();
                }
            }
        }

        signal_task.abort();
        Ok(self.state)
    }

    fn cycle(&mut self) {
        let Self {
            settings,
            topology,
            state,
            store,
            ..
        } = self;
        let result =
            tokio::task::block_in_place(|| run_cycle(settings, topology, state, &**store));
        if let Err(e) = result {
            // already logged inside the cycle span; the loop keeps going
            tracing::warn!(error = %e, "Synthesis cycle did not complete");
        }
    }

    fn reload_topology(&mut self) {
        match load_topology(&self.topology_path) {
            Ok(topology) => self.topology = topology,
            Err(e) => tracing::error!(
                path = %self.topology_path.display(),
                error = %e,
                "Failed to reload topology, keeping current topology"
            ),
        }
    }
}

fn resync_interval(secs: u64) -> Option<Interval> {
    (secs > 0).then(|| {
        let period = Duration::from_secs(secs);
        interval_at(Instant::now() + period, period)
    })
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
