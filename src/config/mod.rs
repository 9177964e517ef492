//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (RSYSLOG_DESTINATION, MAXCONN, ...)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable for the process lifetime)
//!
//! Topology changes:
//!     watcher.rs detects a change to the topology file
//!     → topology loader builds a new Topology
//!     → daemon loop runs one synthesis cycle
//! ```
//!
//! # Design Decisions
//! - Settings are read once at startup; only the topology is watched
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod escape;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_settings, load_settings_with, ConfigError};
pub use schema::Settings;
pub use schema::{DefaultsConfig, GlobalConfig, MonitorConfig, PathsConfig, SslConfig, StatsConfig};
