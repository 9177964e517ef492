//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (maxconn > 0, ports valid)
//! - Detect settings that would produce an unusable configuration
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::path::Path;

use crate::config::schema::Settings;

/// A single semantic problem with the settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("global.maxconn must be greater than zero")]
    ZeroMaxconn,

    #[error("{field} `{value}` is not a valid port")]
    InvalidPort { field: &'static str, value: String },

    #[error("monitor.port is set but monitor.uri is missing")]
    MonitorPortWithoutUri,

    #[error("reload.command must not be empty")]
    EmptyReloadCommand,

    #[error("reload.command does not load paths.config_file `{0}`")]
    ReloadCommandMissesConfig(String),

    #[error("stats.auth must be in `user:password` form")]
    InvalidStatsAuth,
}

/// Validate settings, collecting every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.global.maxconn == 0 {
        errors.push(ValidationError::ZeroMaxconn);
    }

    if !is_port(&settings.stats.port) {
        errors.push(ValidationError::InvalidPort {
            field: "stats.port",
            value: settings.stats.port.clone(),
        });
    }

    if let Some(port) = &settings.monitor.port {
        if !is_port(port) {
            errors.push(ValidationError::InvalidPort {
                field: "monitor.port",
                value: port.clone(),
            });
        }
        if settings.monitor.uri.is_none() {
            errors.push(ValidationError::MonitorPortWithoutUri);
        }
    }

    if settings.reload.command.is_empty() {
        errors.push(ValidationError::EmptyReloadCommand);
    } else if !loads_config_file(settings) {
        errors.push(ValidationError::ReloadCommandMissesConfig(
            settings.paths.config_file.display().to_string(),
        ));
    }

    if !settings.stats.auth.contains(':') {
        errors.push(ValidationError::InvalidStatsAuth);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The command must read the file synthesis writes, via `-f <path>`.
fn loads_config_file(settings: &Settings) -> bool {
    settings
        .reload
        .command
        .windows(2)
        .any(|pair| {
            pair[0] == "-f" && Path::new(&pair[1]) == settings.paths.config_file.as_path()
        })
}

fn is_port(value: &str) -> bool {
    matches!(value.trim().parse::<u16>(), Ok(port) if port > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = Settings::default();
        settings.global.maxconn = 0;
        settings.stats.port = "http".into();
        settings.monitor.port = Some("99999".into());
        settings.reload.command.clear();

        let errors = validate_settings(&settings).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroMaxconn));
        assert!(errors.contains(&ValidationError::MonitorPortWithoutUri));
        assert!(errors.contains(&ValidationError::EmptyReloadCommand));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidPort { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_reload_command_must_load_config_file() {
        let mut settings = Settings::default();
        settings.paths.config_file = "/etc/haproxy/haproxy.cfg".into();
        assert_eq!(
            validate_settings(&settings).unwrap_err(),
            vec![ValidationError::ReloadCommandMissesConfig(
                "/etc/haproxy/haproxy.cfg".into()
            )]
        );

        settings.reload.command[2] = "/etc/haproxy/haproxy.cfg".into();
        assert!(validate_settings(&settings).is_ok());
    }
}
