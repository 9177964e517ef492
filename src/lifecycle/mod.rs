//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load settings → Validate → Load topology
//!
//! Cycle (cycle.rs, detector.rs, state.rs):
//!     Compile → Detect changes → Write → Reload → Commit state
//!
//! Daemon (daemon.rs):
//!     Watcher / SIGHUP / resync timer → one cycle at a time
//!
//! Signals (signals.rs) and shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → Shutdown broadcast → daemon loop exits
//!     SIGHUP → resync
//! ```
//!
//! # Design Decisions
//! - Startup errors are fatal; cycle errors never are
//! - State is committed only after writes succeed

pub mod cycle;
pub mod daemon;
pub mod detector;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use cycle::{run_cycle, CycleError, CycleReport};
pub use daemon::Daemon;
pub use detector::Decision;
pub use shutdown::Shutdown;
pub use state::SynthesisState;
