//! HAProxy configuration synthesizer.
//!
//! Compiles a service topology into a deterministic HAProxy configuration,
//! persists it with the TLS material it references, and reloads HAProxy only
//! when something actually changed.

// Core
pub mod compiler;
pub mod topology;

// Inputs and outputs
pub mod config;
pub mod reload;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use compiler::{compile, Compiled, ConfigDocument};
pub use config::Settings;
pub use lifecycle::{run_cycle, Decision, Shutdown, SynthesisState};
pub use topology::Topology;
