//! Load balancer reload.
//!
//! # State Machine
//! ```text
//! Idle --reload()--> Running(pid)
//! Running(old) --reload()--> spawn `<command> -sf <old>` → wait(old) → Running(new)
//! ```
//!
//! # Design Decisions
//! - The new process is started before the old one is waited on, so the
//!   old process hands over its listeners and finishes in-flight traffic
//! - Reload blocks the caller; the daemon runs cycles in `block_in_place`

pub mod process;

pub use process::HaproxyProcess;

/// Failure to restart the load balancer.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("reload command is empty")]
    EmptyCommand,

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for previous process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Something that can apply a freshly written configuration.
pub trait Reloader: Send {
    fn reload(&mut self) -> Result<(), ReloadError>;
}
