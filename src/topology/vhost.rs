//! Virtual-host declaration grammar.
//!
//! A service's `virtual_host` attribute is a comma-separated list of entries:
//!
//! ```text
//! entry     := [scheme "://"] authority [path]
//! scheme    := "http" | "https" | "ws" | "wss"      (case-insensitive)
//! authority := host [":" port]
//! path      := "/" ...
//! ```
//!
//! The port defaults to 443 for `https`/`wss` and 80 otherwise. The host
//! may be empty or contain `*` wildcards.

use serde::{Deserialize, Serialize};

/// One virtual host entry bound to a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VirtualHost {
    pub service_alias: String,
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

impl VirtualHost {
    /// True for schemes that terminate TLS.
    pub fn is_secure(&self) -> bool {
        matches!(self.scheme.as_str(), "https" | "wss")
    }
}

/// Errors produced while parsing a virtual host entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualHostError {
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("invalid port `{0}`")]
    InvalidPort(String),
}

/// Parse a single entry for `service_alias`.
pub fn parse_entry(service_alias: &str, entry: &str) -> Result<VirtualHost, VirtualHostError> {
    let entry = entry.trim();

    let (scheme, rest) = match entry.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("http".to_string(), entry),
    };
    if !matches!(scheme.as_str(), "http" | "https" | "ws" | "wss") {
        return Err(VirtualHostError::UnsupportedScheme(scheme));
    }

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            match port.parse::<u16>() {
                Ok(p) if p > 0 => {}
                _ => return Err(VirtualHostError::InvalidPort(port.to_string())),
            }
            (host, port.to_string())
        }
        None => {
            let default = if matches!(scheme.as_str(), "https" | "wss") { "443" } else { "80" };
            (authority, default.to_string())
        }
    };

    Ok(VirtualHost {
        service_alias: service_alias.to_string(),
        scheme,
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Parse a comma-separated list, returning each entry's result in order.
pub fn parse_list(
    service_alias: &str,
    value: &str,
) -> Vec<(String, Result<VirtualHost, VirtualHostError>)> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| (entry.to_string(), parse_entry(service_alias, entry)))
        .collect()
}
