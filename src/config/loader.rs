//! Settings loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::escape::{parse_bind_settings, split_settings};
use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load settings from an optional TOML file, apply environment overrides,
/// then validate.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// [`load_settings`] with an explicit variable lookup instead of the
/// process environment.
pub fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, lookup);

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Overlay environment variables onto `settings`.
///
/// `lookup` resolves a variable name; empty values are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(v) = get("RSYSLOG_DESTINATION") {
        settings.global.rsyslog_destination = v;
    }
    if let Some(v) = get("MAXCONN") {
        match v.trim().parse() {
            Ok(maxconn) => settings.global.maxconn = maxconn,
            Err(_) => tracing::warn!(value = %v, "Ignoring non-numeric MAXCONN"),
        }
    }
    if let Some(v) = get("SSL_BIND_OPTIONS") {
        settings.global.ssl_bind_options = Some(v);
    }
    if let Some(v) = get("SSL_BIND_CIPHERS") {
        settings.global.ssl_bind_ciphers = Some(v);
    }
    if let Some(v) = get("EXTRA_GLOBAL_SETTINGS") {
        settings.global.extra_settings = Some(v);
    }
    if let Some(v) = get("BALANCE") {
        settings.defaults.balance = v;
    }
    if let Some(v) = get("MODE") {
        settings.defaults.mode = v;
    }
    if let Some(v) = get("OPTION") {
        settings.defaults.option = split_settings(&v);
    }
    if let Some(v) = get("TIMEOUT") {
        settings.defaults.timeout = split_settings(&v);
    }
    if let Some(v) = get("EXTRA_DEFAULT_SETTINGS") {
        settings.defaults.extra_settings = Some(v);
    }
    if let Some(v) = get("HEALTH_CHECK") {
        settings.defaults.health_check = v;
    }
    if let Some(v) = get("STATS_PORT") {
        settings.stats.port = v;
    }
    if let Some(v) = get("STATS_AUTH") {
        settings.stats.auth = v;
    }
    if let Some(v) = get("HTTP_BASIC_AUTH") {
        settings.http_basic_auth = Some(v);
    }
    if let Some(v) = get("MONITOR_URI") {
        settings.monitor.uri = Some(v);
    }
    if let Some(v) = get("MONITOR_PORT") {
        settings.monitor.port = Some(v);
    }
    if get("SKIP_FORWARDED_PROTO").is_some() {
        settings.skip_forwarded_proto = true;
    }
    if let Some(v) = get("DEFAULT_SSL_CERT").or_else(|| get("SSL_CERT")) {
        settings.ssl.default_ssl_cert = Some(v);
    }
    if let Some(v) = get("CA_CERT") {
        settings.ssl.default_ca_cert = Some(v);
    }
    if let Some(v) = get("EXTRA_BIND_SETTINGS") {
        settings.extra_bind_settings.extend(parse_bind_settings(&v));
    }
    if let Some(v) = get("EXTRA_SSL_CERTS") {
        // names of further variables, each holding one certificate
        for name in split_settings(&v) {
            match get(&name) {
                Some(cert) => settings.ssl.extra_ssl_certs.push(cert),
                None => {
                    tracing::warn!(variable = %name, "Extra SSL certificate variable is unset")
                }
            }
        }
    }
}
