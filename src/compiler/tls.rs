//! Certificate aggregation.
//!
//! # Responsibilities
//! - Collect leaf certificates from settings and the topology
//! - Collect CA certificates independently
//! - Produce the TLS suffix used in `bind` statements
//!
//! # Design Decisions
//! - Certificates are identified by content; sets compare unordered
//! - Source order is kept for writing (`cert0.pem` is the first source)
//! - Malformed PEM is logged, not rejected; HAProxy has the final word

use std::collections::HashSet;
use std::path::Path;

use crate::config::Settings;
use crate::topology::Topology;

/// PEM text identified by its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Certificate(String);

impl Certificate {
    /// Build from raw text, expanding literal `\n` escapes (as found in
    /// environment variables) into newlines.
    pub fn new(raw: &str) -> Self {
        Self(raw.replace("\\n", "\n"))
    }

    pub fn pem(&self) -> &str {
        &self.0
    }

    /// True if the text contains at least one PEM `CERTIFICATE` block.
    pub fn has_pem_certificate(&self) -> bool {
        let mut reader = self.0.as_bytes();
        let found = rustls_pemfile::read_all(&mut reader)
            .any(|item| matches!(item, Ok(rustls_pemfile::Item::X509Certificate(_))));
        found
    }
}

/// Deduplicated certificates in first-insertion order.
///
/// Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct CertificateSet {
    certs: Vec<Certificate>,
}

impl CertificateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate; returns false if it was already present.
    pub fn insert(&mut self, cert: Certificate) -> bool {
        if self.certs.contains(&cert) {
            return false;
        }
        self.certs.push(cert);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certs.iter()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// True when this set is non-empty and differs from `applied`.
    ///
    /// An empty set never counts as a change: the previously written
    /// files stay on disk and the bind suffix disappears from the text.
    pub fn differs_from(&self, applied: &CertificateSet) -> bool {
        !self.is_empty() && self != applied
    }
}

impl PartialEq for CertificateSet {
    fn eq(&self, other: &Self) -> bool {
        let ours: HashSet<&Certificate> = self.certs.iter().collect();
        let theirs: HashSet<&Certificate> = other.certs.iter().collect();
        ours == theirs
    }
}

impl Eq for CertificateSet {}

impl FromIterator<Certificate> for CertificateSet {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut set = Self::new();
        for cert in iter {
            set.insert(cert);
        }
        set
    }
}

/// Certificates resolved for one cycle plus the derived bind suffix.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub certs: CertificateSet,
    pub cacerts: CertificateSet,
    ssl_bind_string: Option<String>,
}

impl TlsMaterial {
    /// `ssl crt ...` suffix, present when any certificate is configured.
    pub fn ssl_bind_string(&self) -> Option<&str> {
        self.ssl_bind_string.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.ssl_bind_string.is_some()
    }
}

/// Collect certificates from every source and compute the bind suffix.
pub fn aggregate(settings: &Settings, topology: &Topology) -> TlsMaterial {
    let leaf_sources = settings
        .ssl
        .default_ssl_cert
        .iter()
        .map(String::as_str)
        .chain(settings.ssl.extra_ssl_certs.iter().map(String::as_str))
        .chain(topology.default_ssl_certs())
        .chain(topology.ssl_certs());
    let certs = collect(leaf_sources);
    let cacerts = collect(settings.ssl.default_ca_cert.iter().map(String::as_str));

    let mut bind = String::new();
    if !certs.is_empty() {
        bind.push_str(&cert_clause(&settings.paths.cert_dir));
    }
    if !cacerts.is_empty() {
        if certs.is_empty() {
            tracing::warn!(
                cacerts = cacerts.len(),
                "CA certificate configured without any server certificate, bind lacks `ssl crt`"
            );
        }
        bind.push_str(&ca_clause(&settings.paths.cacert_dir));
    }
    let bind = bind.trim().to_string();

    TlsMaterial {
        certs,
        cacerts,
        ssl_bind_string: (!bind.is_empty()).then_some(bind),
    }
}

fn collect<'a>(sources: impl Iterator<Item = &'a str>) -> CertificateSet {
    sources
        .filter(|raw| !raw.trim().is_empty())
        .map(Certificate::new)
        .inspect(|cert| {
            if !cert.has_pem_certificate() {
                tracing::warn!("Certificate has no PEM CERTIFICATE block");
            }
        })
        .collect()
}

fn cert_clause(cert_dir: &Path) -> String {
    format!("ssl crt {}", cert_dir.display())
}

fn ca_clause(cacert_dir: &Path) -> String {
    format!(" ca-file {} verify required", cacert_dir.join("cert0.pem").display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ServiceDefinition, ServiceDetails};

    const CERT_A: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
    const CERT_B: &str = "-----BEGIN CERTIFICATE-----\nMIIC\n-----END CERTIFICATE-----\n";

    #[test]
    fn test_set_equality_ignores_order() {
        let a: CertificateSet = [Certificate::new(CERT_A), Certificate::new(CERT_B)]
            .into_iter()
            .collect();
        let b: CertificateSet = [Certificate::new(CERT_B), Certificate::new(CERT_A)]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert!(!a.differs_from(&b));
    }

    #[test]
    fn test_duplicates_collapse() {
        let set: CertificateSet = [CERT_A, CERT_A, CERT_B]
            .into_iter()
            .map(Certificate::new)
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_set_is_never_a_change() {
        let applied: CertificateSet = [Certificate::new(CERT_A)].into_iter().collect();
        assert!(!CertificateSet::new().differs_from(&applied));
        assert!(applied.differs_from(&CertificateSet::new()));
    }

    #[test]
    fn test_escaped_newlines_are_expanded() {
        let cert =
            Certificate::new("-----BEGIN CERTIFICATE-----\\nMIIB\\n-----END CERTIFICATE-----\\n");
        assert_eq!(cert, Certificate::new(CERT_A));
        assert!(cert.has_pem_certificate());
        assert!(!Certificate::new("not a cert").has_pem_certificate());
    }

    #[test]
    fn test_aggregate_sources_and_bind_string() {
        let mut settings = Settings::default();
        settings.ssl.default_ssl_cert = Some(CERT_A.into());
        settings.ssl.default_ca_cert = Some(CERT_B.into());
        let topology = Topology::from_services(vec![(
            "web",
            ServiceDefinition::new(ServiceDetails {
                ssl_cert: Some(CERT_B.into()),
                default_ssl_cert: Some(CERT_A.into()),
                ..Default::default()
            }),
        )]);

        let tls = aggregate(&settings, &topology);
        assert_eq!(tls.certs.len(), 2);
        assert_eq!(tls.certs.iter().next().unwrap().pem(), CERT_A);
        assert_eq!(tls.cacerts.len(), 1);
        assert_eq!(
            tls.ssl_bind_string(),
            Some("ssl crt /certs/ ca-file /cacerts/cert0.pem verify required")
        );
    }

    #[test]
    fn test_ca_only_bind_string_has_no_leading_space() {
        let mut settings = Settings::default();
        settings.ssl.default_ca_cert = Some(CERT_B.into());

        let tls = aggregate(&settings, &Topology::default());
        assert!(tls.certs.is_empty());
        assert_eq!(tls.cacerts.len(), 1);
        assert_eq!(
            tls.ssl_bind_string(),
            Some("ca-file /cacerts/cert0.pem verify required")
        );
    }

    #[test]
    fn test_aggregate_without_certs() {
        let tls = aggregate(&Settings::default(), &Topology::default());
        assert!(!tls.enabled());
        assert!(tls.certs.is_empty());
    }
}
