//! State carried between synthesis cycles.

use crate::compiler::CertificateSet;
use crate::reload::Reloader;

/// What was last applied, plus the handle used to reload.
///
/// Owned by the daemon loop and mutated only by a cycle after its writes
/// succeed.
pub struct SynthesisState {
    pub last_applied_text: Option<String>,
    pub last_certs: CertificateSet,
    pub last_cacerts: CertificateSet,
    pub reloader: Box<dyn Reloader>,
}

impl SynthesisState {
    pub fn new(reloader: Box<dyn Reloader>) -> Self {
        Self {
            last_applied_text: None,
            last_certs: CertificateSet::new(),
            last_cacerts: CertificateSet::new(),
            reloader,
        }
    }
}

impl std::fmt::Debug for SynthesisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisState")
            .field("last_applied_bytes", &self.last_applied_text.as_ref().map(String::len))
            .field("last_certs", &self.last_certs.len())
            .field("last_cacerts", &self.last_cacerts.len())
            .finish_non_exhaustive()
    }
}
