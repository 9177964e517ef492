//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the synthesizer.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings for the configuration synthesizer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// `global` section settings.
    pub global: GlobalConfig,

    /// `defaults` section settings.
    pub defaults: DefaultsConfig,

    /// `listen stats` section settings.
    pub stats: StatsConfig,

    /// Monitoring endpoint.
    pub monitor: MonitorConfig,

    /// Statically configured certificates.
    pub ssl: SslConfig,

    /// Basic-auth list, `user:pass` pairs separated by commas (`\,` escapes).
    pub http_basic_auth: Option<String>,

    /// Do not add `X-Forwarded-Proto` headers in frontends.
    pub skip_forwarded_proto: bool,

    /// Extra bind options keyed by the literal port token.
    pub extra_bind_settings: BTreeMap<String, String>,

    /// Output locations.
    pub paths: PathsConfig,

    /// Reload command.
    pub reload: ReloadConfig,

    /// Daemon loop behavior.
    pub daemon: DaemonConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// `global` section settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Syslog destination for the `log` statements.
    pub rsyslog_destination: String,

    /// Global connection limit.
    pub maxconn: u32,

    /// Value for `ssl-default-bind-options`.
    pub ssl_bind_options: Option<String>,

    /// Value for `ssl-default-bind-ciphers`.
    pub ssl_bind_ciphers: Option<String>,

    /// Free-form statements appended verbatim (comma separated).
    pub extra_settings: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rsyslog_destination: "127.0.0.1".to_string(),
            maxconn: 4096,
            ssl_bind_options: None,
            ssl_bind_ciphers: None,
            extra_settings: None,
        }
    }
}

/// `defaults` section settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default balancing algorithm.
    pub balance: String,

    /// Default proxy mode (`http` or `tcp`).
    pub mode: String,

    /// `option` statements.
    pub option: Vec<String>,

    /// `timeout` statements.
    pub timeout: Vec<String>,

    /// Free-form statements appended verbatim (comma separated).
    pub extra_settings: Option<String>,

    /// Health-check suffix for `server` lines when a service has none.
    pub health_check: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            balance: "roundrobin".to_string(),
            mode: "http".to_string(),
            option: vec![
                "redispatch".to_string(),
                "httplog".to_string(),
                "dontlognull".to_string(),
                "forwardfor".to_string(),
            ],
            timeout: vec![
                "connect 5000".to_string(),
                "client 50000".to_string(),
                "server 50000".to_string(),
            ],
            extra_settings: None,
            health_check: "check inter 2000 rise 2 fall 3".to_string(),
        }
    }
}

/// Stats listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Stats listener port.
    pub port: String,

    /// `user:password` for the stats page.
    pub auth: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            port: "1936".to_string(),
            auth: "stats:stats".to_string(),
        }
    }
}

/// Monitoring endpoint settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// URI answered by `monitor-uri`.
    pub uri: Option<String>,

    /// Port carrying the monitor URI. Defaults to 80 when unset.
    pub port: Option<String>,
}

/// Statically configured certificates (PEM text, `\n` escapes allowed).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SslConfig {
    /// Default leaf certificate.
    pub default_ssl_cert: Option<String>,

    /// Additional leaf certificates.
    pub extra_ssl_certs: Vec<String>,

    /// CA certificate for client verification.
    pub default_ca_cert: Option<String>,
}

/// Output locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Generated HAProxy configuration file.
    pub config_file: PathBuf,

    /// Directory holding leaf certificates (`crt` argument).
    pub cert_dir: PathBuf,

    /// Directory holding the concatenated CA file.
    pub cacert_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("/haproxy.cfg"),
            cert_dir: PathBuf::from("/certs/"),
            cacert_dir: PathBuf::from("/cacerts/"),
        }
    }
}

/// Reload command configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Command used to launch HAProxy; `-sf <pid>` is appended on reload.
    /// Must pass `-f` with `paths.config_file`.
    pub command: Vec<String>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "/usr/sbin/haproxy".to_string(),
                "-f".to_string(),
                "/haproxy.cfg".to_string(),
                "-db".to_string(),
                "-q".to_string(),
            ],
        }
    }
}

/// Daemon loop configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Re-run synthesis periodically even without a change event (0 = off).
    pub resync_interval_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Settings {
    /// Look up extra bind options for a port token.
    pub fn extra_bind(&self, port: &str) -> Option<&str> {
        self.extra_bind_settings.get(port).map(String::as_str)
    }

    /// The port the monitor URI is served on.
    pub fn monitor_port(&self) -> &str {
        self.monitor.port.as_deref().unwrap_or("80")
    }
}
