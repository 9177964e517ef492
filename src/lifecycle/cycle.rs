//! One synthesis cycle.
//!
//! # Data Flow
//! ```text
//! Settings + Topology
//!     → compile (document + certificate sets)
//!     → detect changes against SynthesisState
//!     → write changed certificates, then the config file
//!     → reload
//!     → commit state
//! ```
//!
//! # Failure Semantics
//! - A failed write aborts the cycle before any reload; state is untouched
//!   so the next cycle retries the same writes
//! - A failed reload still commits state: the files on disk are what the
//!   next successful reload will pick up

use crate::compiler::{self, CertificateSet};
use crate::config::Settings;
use crate::lifecycle::detector::{Changes, Decision};
use crate::lifecycle::state::SynthesisState;
use crate::observability::{metrics, tracing::cycle_span};
use crate::reload::ReloadError;
use crate::storage::{ArtifactStore, StorageError};
use crate::topology::Topology;

/// Why a cycle did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("write failed, reload skipped: {0}")]
    Write(#[from] StorageError),

    #[error("reload failed: {0}")]
    Reload(#[from] ReloadError),
}

/// What a completed cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub decision: Decision,
    pub changes: Changes,
    pub config_bytes: usize,
}

/// Compile `topology`, apply what changed and reload when needed.
pub fn run_cycle(
    settings: &Settings,
    topology: &Topology,
    state: &mut SynthesisState,
    store: &dyn ArtifactStore,
) -> Result<CycleReport, CycleError> {
    let _span = cycle_span().entered();

    let compiled = compiler::compile(settings, topology);
    let text = compiled.text();
    let changes = Changes::detect(state, &text, &compiled.tls.certs, &compiled.tls.cacerts);
    let report = CycleReport {
        decision: changes.decision(),
        changes,
        config_bytes: text.len(),
    };
    metrics::record_config_bytes(text.len());

    if report.decision == Decision::Unchanged {
        tracing::info!("HAProxy configuration unchanged");
        metrics::record_cycle(report.decision.as_str());
        return Ok(report);
    }

    if let Err(e) = write_artifacts(
        store,
        &changes,
        &text,
        &compiled.tls.certs,
        &compiled.tls.cacerts,
    ) {
        tracing::error!(error = %e, "Failed to write artifacts, keeping previous state");
        metrics::record_write_failure();
        metrics::record_cycle("write_failed");
        return Err(e.into());
    }

    if changes.text {
        tracing::info!(
            bytes = text.len(),
            sections = compiled.document.len(),
            "HAProxy configuration updated"
        );
        tracing::debug!(config = %text, "New configuration");
    }
    if changes.certs || changes.cacerts {
        tracing::info!(
            certs = compiled.tls.certs.len(),
            cacerts = compiled.tls.cacerts.len(),
            "SSL certificates updated"
        );
    }

    let reloaded = state.reloader.reload();

    state.last_applied_text = Some(text);
    if changes.certs {
        state.last_certs = compiled.tls.certs;
    }
    if changes.cacerts {
        state.last_cacerts = compiled.tls.cacerts;
    }

    match reloaded {
        Ok(()) => {
            tracing::info!(decision = report.decision.as_str(), "HAProxy reloaded");
            metrics::record_reload(true);
            metrics::record_cycle(report.decision.as_str());
            Ok(report)
        }
        Err(e) => {
            tracing::error!(error = %e, "HAProxy reload failed");
            metrics::record_reload(false);
            metrics::record_cycle("reload_failed");
            Err(e.into())
        }
    }
}

fn write_artifacts(
    store: &dyn ArtifactStore,
    changes: &Changes,
    text: &str,
    certs: &CertificateSet,
    cacerts: &CertificateSet,
) -> Result<(), StorageError> {
    if changes.certs {
        store.write_certs(certs)?;
    }
    if changes.cacerts {
        store.write_cacerts(cacerts)?;
    }
    if changes.text {
        store.write_config(text)?;
    }
    Ok(())
}
