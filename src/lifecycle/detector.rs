//! Change detection.
//!
//! # Decision Table
//! ```text
//! text    certs / cacerts   → decision
//! same    same              → Unchanged
//! same    changed           → ReloadOnly
//! changed any               → WriteAndReload
//! ```
//! Certificate sets compare unordered. An empty set never counts as a
//! change, so removing every certificate leaves the old files in place.

use crate::compiler::CertificateSet;
use crate::lifecycle::state::SynthesisState;

/// What a cycle has to do with its freshly compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Unchanged,
    ReloadOnly,
    WriteAndReload,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Unchanged => "unchanged",
            Decision::ReloadOnly => "reload_only",
            Decision::WriteAndReload => "write_and_reload",
        }
    }
}

/// Which artifacts differ from the last applied ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changes {
    pub text: bool,
    pub certs: bool,
    pub cacerts: bool,
}

impl Changes {
    pub fn detect(
        state: &SynthesisState,
        text: &str,
        certs: &CertificateSet,
        cacerts: &CertificateSet,
    ) -> Self {
        Self {
            text: state.last_applied_text.as_deref() != Some(text),
            certs: certs.differs_from(&state.last_certs),
            cacerts: cacerts.differs_from(&state.last_cacerts),
        }
    }

    pub fn decision(&self) -> Decision {
        if self.text {
            Decision::WriteAndReload
        } else if self.certs || self.cacerts {
            Decision::ReloadOnly
        } else {
            Decision::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Certificate;
    use crate::reload::{ReloadError, Reloader};

    struct Noop;

    impl Reloader for Noop {
        fn reload(&mut self) -> Result<(), ReloadError> {
            Ok(())
        }
    }

    fn set(pems: &[&str]) -> CertificateSet {
        pems.iter().map(|p| Certificate::new(p)).collect()
    }

    #[test]
    fn test_first_cycle_writes() {
        let state = SynthesisState::new(Box::new(Noop));
        let changes = Changes::detect(&state, "global", &set(&[]), &set(&[]));
        assert_eq!(changes.decision(), Decision::WriteAndReload);
    }

    #[test]
    fn test_decision_table() {
        let mut state = SynthesisState::new(Box::new(Noop));
        state.last_applied_text = Some("global".into());
        state.last_certs = set(&["A", "B"]);

        let same = Changes::detect(&state, "global", &set(&["B", "A"]), &set(&[]));
        assert_eq!(same.decision(), Decision::Unchanged);

        let certs = Changes::detect(&state, "global", &set(&["A", "C"]), &set(&[]));
        assert_eq!(certs.decision(), Decision::ReloadOnly);

        let cacerts = Changes::detect(&state, "global", &set(&["A", "B"]), &set(&["CA"]));
        assert!(cacerts.cacerts && !cacerts.certs);
        assert_eq!(cacerts.decision(), Decision::ReloadOnly);

        let text = Changes::detect(&state, "global\n  daemon", &set(&["A", "B"]), &set(&[]));
        assert_eq!(text.decision(), Decision::WriteAndReload);
    }

    #[test]
    fn test_empty_set_is_not_a_change() {
        let mut state = SynthesisState::new(Box::new(Noop));
        state.last_applied_text = Some("global".into());
        state.last_certs = set(&["A"]);

        let changes = Changes::detect(&state, "global", &set(&[]), &set(&[]));
        assert_eq!(changes.decision(), Decision::Unchanged);
    }
}
