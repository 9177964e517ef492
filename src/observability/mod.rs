//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (cycle, reload and failure counters)
//!     → tracing.rs (one span per synthesis cycle, keyed by cycle id)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields everywhere so JSON output is machine-parseable
//! - `RUST_LOG` wins over the configured level
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
pub mod tracing;
