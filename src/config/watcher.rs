//! Topology file watcher for event-driven synthesis.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::topology::{load_topology, Topology};

/// A watcher that monitors the topology file for changes.
pub struct TopologyWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Topology>,
}

impl TopologyWatcher {
    /// Create a new TopologyWatcher.
    ///
    /// Returns the watcher and a receiver for freshly loaded topologies.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Topology>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The parent directory is watched so that files replaced by rename
    /// (the usual way generators publish) are still picked up.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!(path = ?path, "Topology change detected, reloading");
                        match load_topology(&path) {
                            Ok(topology) => {
                                let _ = tx.send(topology);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload topology: {}. Keeping current topology.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Topology watcher started");
        Ok(watcher)
    }
}
