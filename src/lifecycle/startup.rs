//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate settings (file, then environment)
//! - Load the initial topology
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, unlike a watched reload which
//!   keeps the previous topology

use std::path::{Path, PathBuf};

use crate::config::{load_settings, ConfigError, Settings};
use crate::topology::{load_topology, Topology, TopologyLoadError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("topology {path}: {source}")]
    Topology {
        path: PathBuf,
        #[source]
        source: TopologyLoadError,
    },
}

/// Everything needed to run the first cycle.
#[derive(Debug)]
pub struct Startup {
    pub settings: Settings,
    pub topology: Topology,
}

pub fn load(settings_path: Option<&Path>, topology_path: &Path) -> Result<Startup, StartupError> {
    Ok(Startup {
        settings: settings(settings_path)?,
        topology: topology(topology_path)?,
    })
}

pub fn settings(path: Option<&Path>) -> Result<Settings, StartupError> {
    let settings = load_settings(path)?;
    tracing::info!(
        settings = ?path,
        config_file = %settings.paths.config_file.display(),
        maxconn = settings.global.maxconn,
        "Settings loaded"
    );
    Ok(settings)
}

pub fn topology(path: &Path) -> Result<Topology, StartupError> {
    let topology = load_topology(path).map_err(|source| StartupError::Topology {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        topology = %path.display(),
        services = topology.services().len(),
        routes = topology.route_count(),
        vhosts = topology.vhosts().len(),
        "Topology loaded"
    );
    Ok(topology)
}
