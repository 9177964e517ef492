//! Fixed sections: `global`, `defaults`, `listen stats`, userlist.
//!
//! These depend on settings only, never on the topology.

use crate::compiler::document::Section;
use crate::config::escape::{parse_credentials, split_settings};
use crate::config::Settings;

pub const USERLIST: &str = "haproxy_userlist";

pub fn global(settings: &Settings) -> Section {
    let global = &settings.global;
    let mut statements = vec![
        format!("log {} local0", global.rsyslog_destination),
        format!("log {} local1 notice", global.rsyslog_destination),
        "log-send-hostname".to_string(),
        format!("maxconn {}", global.maxconn),
        "pidfile /var/run/haproxy.pid".to_string(),
        "user haproxy".to_string(),
        "group haproxy".to_string(),
        "daemon".to_string(),
        "stats socket /var/run/haproxy.stats level admin".to_string(),
    ];
    if let Some(options) = non_empty(&global.ssl_bind_options) {
        statements.push(format!("ssl-default-bind-options {}", options));
    }
    if let Some(ciphers) = non_empty(&global.ssl_bind_ciphers) {
        statements.push(format!("ssl-default-bind-ciphers {}", ciphers));
    }
    if let Some(extra) = non_empty(&global.extra_settings) {
        statements.extend(split_settings(extra));
    }
    Section::new("global", statements)
}

pub fn defaults(settings: &Settings) -> Section {
    let defaults = &settings.defaults;
    let mut statements = vec![
        format!("balance {}", defaults.balance),
        "log global".to_string(),
        format!("mode {}", defaults.mode),
    ];
    statements.extend(
        defaults
            .option
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(|o| format!("option {}", o)),
    );
    statements.extend(
        defaults
            .timeout
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| format!("timeout {}", t)),
    );
    if let Some(extra) = non_empty(&defaults.extra_settings) {
        statements.extend(split_settings(extra));
    }
    Section::new("defaults", statements)
}

pub fn stats(settings: &Settings) -> Section {
    let mut bind = format!("bind :{}", settings.stats.port);
    if let Some(extra) = settings
        .extra_bind(&settings.stats.port)
        .filter(|e| !e.trim().is_empty())
    {
        bind.push(' ');
        bind.push_str(extra.trim());
    }
    Section::new(
        "listen stats",
        vec![
            bind,
            "mode http".to_string(),
            "stats enable".to_string(),
            "timeout connect 10s".to_string(),
            "timeout client 1m".to_string(),
            "timeout server 1m".to_string(),
            "stats hide-version".to_string(),
            r"stats realm Haproxy\ Statistics".to_string(),
            "stats uri /".to_string(),
            format!("stats auth {}", settings.stats.auth),
        ],
    )
}

/// The basic-auth userlist, absent when no valid credential is configured.
pub fn userlist(settings: &Settings) -> Option<Section> {
    let credentials = parse_credentials(settings.http_basic_auth.as_deref()?);
    if credentials.is_empty() {
        return None;
    }
    let statements = credentials
        .iter()
        .map(|c| format!("user {} insecure-password {}", c.username, c.password))
        .collect();
    Some(Section::new(format!("userlist {}", USERLIST), statements))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_defaults() {
        let section = global(&Settings::default());
        assert_eq!(section.statements[0], "log 127.0.0.1 local0");
        assert_eq!(section.statements[3], "maxconn 4096");
        assert_eq!(section.statements.len(), 9);
    }

    #[test]
    fn test_global_ssl_and_extra() {
        let mut settings = Settings::default();
        settings.global.ssl_bind_options = Some("no-sslv3".into());
        settings.global.extra_settings = Some("tune.ssl.default-dh-param 2048, nbproc 1".into());
        let section = global(&settings);
        assert_eq!(
            &section.statements[9..],
            &[
                "ssl-default-bind-options no-sslv3",
                "tune.ssl.default-dh-param 2048",
                "nbproc 1",
            ]
        );
    }

    #[test]
    fn test_defaults_section() {
        let section = defaults(&Settings::default());
        assert_eq!(
            section.statements,
            vec![
                "balance roundrobin",
                "log global",
                "mode http",
                "option redispatch",
                "option httplog",
                "option dontlognull",
                "option forwardfor",
                "timeout connect 5000",
                "timeout client 50000",
                "timeout server 50000",
            ]
        );
    }

    #[test]
    fn test_stats_extra_bind() {
        let mut settings = Settings::default();
        settings.extra_bind_settings.insert("1936".into(), "accept-proxy".into());
        let section = stats(&settings);
        assert_eq!(section.name, "listen stats");
        assert_eq!(section.statements[0], "bind :1936 accept-proxy");
        assert_eq!(section.statements[9], "stats auth stats:stats");
    }

    #[test]
    fn test_userlist() {
        let mut settings = Settings::default();
        assert!(userlist(&settings).is_none());

        settings.http_basic_auth = Some(r"alice:secret,bob:pw\,2".into());
        let section = userlist(&settings).unwrap();
        assert_eq!(section.name, "userlist haproxy_userlist");
        assert_eq!(
            section.statements,
            vec![
                "user alice insecure-password secret",
                "user bob insecure-password pw,2",
            ]
        );
    }
}
