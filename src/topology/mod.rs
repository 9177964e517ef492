//! Service topology subsystem.
//!
//! # Data Flow
//! ```text
//! topology file (TOML/JSON)
//!     → loader.rs (deserialize, drop incomplete routes)
//!     → vhost.rs (parse `virtual_host` declarations)
//!     → Topology (immutable snapshot for one synthesis cycle)
//! ```
//!
//! # Design Decisions
//! - Rebuilt from scratch every cycle, never patched in place
//! - Keyed by alias in ordered maps so iteration order is deterministic
//! - Incomplete entries are dropped with a warning, never fatal

pub mod loader;
pub mod model;
pub mod vhost;

pub use loader::{load_topology, TopologyLoadError};
pub use model::{Route, ServiceDefinition, ServiceDetails, Topology, TopologyIncompleteError};
pub use vhost::VirtualHost;
