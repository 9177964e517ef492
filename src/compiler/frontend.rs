//! Frontend sections.
//!
//! # State Machine
//! ```text
//! vhosts present                       → one frontend per vhost port with host/path rules
//! no vhosts, unconsumed routes remain  → default_port_80 (+ default_port_443 with TLS)
//! otherwise                            → no routing frontend
//!
//! then: monitor URI configured and not yet declared → frontend monitor
//! ```
//!
//! Ports already bound by `listen stats` or a TCP listener are never bound
//! again; the frontend that would claim one is dropped with a warning.

use std::collections::{BTreeSet, HashSet};

use crate::compiler::backend::DEFAULT_BACKEND;
use crate::compiler::document::Section;
use crate::compiler::tls::TlsMaterial;
use crate::config::Settings;
use crate::topology::{Route, Topology, VirtualHost};

const FORWARDED_HTTP: &str = r"reqadd X-Forwarded-Proto:\ http";
const FORWARDED_HTTPS: &str = r"reqadd X-Forwarded-Proto:\ https";

/// Frontend sections plus the default-route decision backends depend on.
#[derive(Debug, Default)]
pub struct Frontends {
    pub sections: Vec<Section>,
    pub require_default_route: bool,
}

/// True when some route was not consumed by a TCP listener.
pub fn require_default_route(topology: &Topology, routes_added: &HashSet<Route>) -> bool {
    topology
        .routes()
        .values()
        .flatten()
        .any(|route| !routes_added.contains(route))
}

/// Ports bound before any frontend: the stats listener plus `tcp_ports`.
fn reserved_ports(settings: &Settings, tcp_ports: &[u16]) -> BTreeSet<String> {
    let mut reserved: BTreeSet<String> = tcp_ports.iter().map(u16::to_string).collect();
    reserved.insert(settings.stats.port.trim().to_string());
    reserved
}

fn port_free(reserved: &BTreeSet<String>, port: &str, frontend: &str) -> bool {
    if reserved.contains(port.trim()) {
        tracing::warn!(port = %port, frontend = %frontend, "Port already bound, skipping frontend");
        return false;
    }
    true
}

pub fn build(
    settings: &Settings,
    topology: &Topology,
    tls: &TlsMaterial,
    routes_added: &HashSet<Route>,
    tcp_ports: &[u16],
) -> Frontends {
    let reserved = reserved_ports(settings, tcp_ports);
    let mut frontends = Frontends::default();
    let mut monitor_configured = false;

    if !topology.vhosts().is_empty() {
        let (sections, monitored) =
            vhost_frontends(settings, topology.vhosts(), tls, &reserved);
        frontends.sections = sections;
        monitor_configured = monitored;
    } else {
        frontends.require_default_route = require_default_route(topology, routes_added);
        if frontends.require_default_route {
            let (sections, monitored) = default_frontends(settings, tls, &reserved);
            frontends.sections = sections;
            monitor_configured = monitored;
        }
    }

    if let Some(monitor) = monitor_frontend(settings, monitor_configured)
        .filter(|_| port_free(&reserved, settings.monitor_port(), "monitor"))
    {
        frontends.sections.push(monitor);
    }

    frontends
}

fn bind_statement(settings: &Settings, port: &str, ssl: Option<&str>) -> String {
    let mut bind = format!("bind :{}", port);
    if let Some(ssl) = ssl {
        bind.push(' ');
        bind.push_str(ssl);
    }
    if let Some(extra) = settings.extra_bind(port).filter(|e| !e.trim().is_empty()) {
        bind.push(' ');
        bind.push_str(extra.trim());
    }
    bind
}

fn monitor_here(settings: &Settings, port: &str) -> Option<String> {
    settings
        .monitor
        .uri
        .as_ref()
        .filter(|_| settings.monitor_port() == port)
        .map(|uri| format!("monitor-uri {}", uri))
}

fn default_frontends(
    settings: &Settings,
    tls: &TlsMaterial,
    reserved: &BTreeSet<String>,
) -> (Vec<Section>, bool) {
    let mut sections = Vec::new();
    let mut monitored = false;

    if port_free(reserved, "80", "default_port_80") {
        let mut http = vec![bind_statement(settings, "80", None)];
        if !settings.skip_forwarded_proto {
            http.push(FORWARDED_HTTP.to_string());
        }
        if let Some(monitor) = monitor_here(settings, "80") {
            http.push(monitor);
            monitored = true;
        }
        http.push(format!("default_backend {}", DEFAULT_BACKEND));
        sections.push(Section::new("frontend default_port_80", http));
    }

    if let Some(ssl) = tls
        .ssl_bind_string()
        .filter(|_| port_free(reserved, "443", "default_port_443"))
    {
        let mut https = vec![bind_statement(settings, "443", Some(ssl))];
        if !settings.skip_forwarded_proto {
            https.push(FORWARDED_HTTPS.to_string());
        }
        if let Some(monitor) = monitor_here(settings, "443") {
            https.push(monitor);
            monitored = true;
        }
        https.push(format!("default_backend {}", DEFAULT_BACKEND));
        sections.push(Section::new("frontend default_port_443", https));
    }

    (sections, monitored)
}

fn vhost_frontends(
    settings: &Settings,
    vhosts: &[VirtualHost],
    tls: &TlsMaterial,
    reserved: &BTreeSet<String>,
) -> (Vec<Section>, bool) {
    let mut sections: Vec<Section> = Vec::new();
    let mut skipped: BTreeSet<&str> = BTreeSet::new();
    let mut monitored = false;

    for (index, vhost) in vhosts.iter().enumerate() {
        let rule = index + 1;
        let name = format!("frontend port_{}", vhost.port);
        if skipped.contains(vhost.port.as_str()) {
            continue;
        }
        if !sections.iter().any(|s| s.name == name) && !port_free(reserved, &vhost.port, &name) {
            skipped.insert(vhost.port.as_str());
            continue;
        }

        let position = match sections.iter().position(|s| s.name == name) {
            Some(position) => position,
            None => {
                let secure = tls.enabled()
                    && vhosts
                        .iter()
                        .any(|v| v.port == vhost.port && v.is_secure());
                let ssl = if secure { tls.ssl_bind_string() } else { None };

                let mut statements = vec![bind_statement(settings, &vhost.port, ssl)];
                if !settings.skip_forwarded_proto {
                    let header = if secure { FORWARDED_HTTPS } else { FORWARDED_HTTP };
                    statements.push(header.to_string());
                }
                if let Some(monitor) = monitor_here(settings, &vhost.port) {
                    statements.push(monitor);
                    monitored = true;
                }
                sections.push(Section::new(name, statements));
                sections.len() - 1
            }
        };

        sections[position].statements.extend(vhost_rules(vhost, rule));
    }

    (sections, monitored)
}

fn wildcard_regex(pattern: &str) -> String {
    pattern.replace('.', r"\.").replace('*', ".*")
}

/// ACL and `use_backend` statements for one vhost.
fn vhost_rules(vhost: &VirtualHost, rule: usize) -> Vec<String> {
    let mut statements = Vec::new();

    let host = vhost.host.trim().trim_matches('/');
    let has_host = !host.is_empty() && host != "*";
    if has_host {
        if host.contains('*') {
            let regex = wildcard_regex(host);
            statements.push(format!("acl host_rule_{} hdr_reg(host) -i ^{}$", rule, regex));
            statements.push(format!(
                "acl host_rule_{}_port hdr_reg(host) -i ^{}:{}$",
                rule, regex, vhost.port
            ));
        } else {
            statements.push(format!("acl host_rule_{} hdr(host) -i {}", rule, host));
            statements.push(format!(
                "acl host_rule_{}_port hdr(host) -i {}:{}",
                rule, host, vhost.port
            ));
        }
    }

    let path = vhost.path.trim();
    let has_path = !path.is_empty();
    if has_path {
        if path.contains('*') {
            statements.push(format!(
                "acl path_rule_{} path_reg -i ^{}$",
                rule,
                path.replace('*', ".*")
            ));
        } else {
            statements.push(format!("acl path_rule_{} path -i {}", rule, path));
        }
    }

    let condition = match (has_host, has_path) {
        (true, true) => format!(
            "host_rule_{r} path_rule_{r} or host_rule_{r}_port path_rule_{r}",
            r = rule
        ),
        (true, false) => format!("host_rule_{r} or host_rule_{r}_port", r = rule),
        (false, true) => format!("path_rule_{}", rule),
        (false, false) => return statements,
    };
    statements.push(format!(
        "use_backend SERVICE_{} if {}",
        vhost.service_alias, condition
    ));
    statements
}

fn monitor_frontend(settings: &Settings, already_configured: bool) -> Option<Section> {
    if already_configured {
        return None;
    }
    let uri = settings.monitor.uri.as_ref()?;
    Some(Section::new(
        "frontend monitor",
        vec![
            format!("bind :{}", settings.monitor_port()),
            format!("monitor-uri {}", uri),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::tls;
    use crate::topology::{ServiceDefinition, ServiceDetails};

    const CERT: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn vhost_topology(entries: &[(&str, &str)]) -> Topology {
        Topology::from_services(entries.iter().map(|(alias, vhost)| {
            let definition = ServiceDefinition::new(ServiceDetails {
                virtual_host: Some(vhost.to_string()),
                ..Default::default()
            })
            .with_route(Route::new(format!("{}_1", alias), "10.0.0.2", "80"));
            (alias.to_string(), definition)
        }))
    }

    #[test]
    fn test_two_vhosts_one_frontend() {
        let settings = Settings::default();
        let topology = vhost_topology(&[("svcB", "b.example.com"), ("svcA", "a.example.com")]);
        let material = tls::aggregate(&settings, &topology);

        let frontends = build(&settings, &topology, &material, &HashSet::new(), &[]);
        assert!(!frontends.require_default_route);
        assert_eq!(frontends.sections.len(), 1);
        assert_eq!(
            frontends.sections[0].statements,
            vec![
                "bind :80",
                r"reqadd X-Forwarded-Proto:\ http",
                "acl host_rule_1 hdr(host) -i a.example.com",
                "acl host_rule_1_port hdr(host) -i a.example.com:80",
                "use_backend SERVICE_svcA if host_rule_1 or host_rule_1_port",
                "acl host_rule_2 hdr(host) -i b.example.com",
                "acl host_rule_2_port hdr(host) -i b.example.com:80",
                "use_backend SERVICE_svcB if host_rule_2 or host_rule_2_port",
            ]
        );
    }

    #[test]
    fn test_wildcards_and_https_port() {
        let mut settings = Settings::default();
        settings.ssl.default_ssl_cert = Some(CERT.into());
        settings.skip_forwarded_proto = true;
        let topology = vhost_topology(&[("web", "https://*.example.com/api/*")]);
        let material = tls::aggregate(&settings, &topology);

        let frontends = build(&settings, &topology, &material, &HashSet::new(), &[]);
        let section = &frontends.sections[0];
        assert_eq!(section.name, "frontend port_443");
        assert_eq!(
            section.statements,
            vec![
                "bind :443 ssl crt /certs/",
                r"acl host_rule_1 hdr_reg(host) -i ^.*\.example\.com$",
                r"acl host_rule_1_port hdr_reg(host) -i ^.*\.example\.com:443$",
                "acl path_rule_1 path_reg -i ^/api/.*$",
                "use_backend SERVICE_web if host_rule_1 path_rule_1 or host_rule_1_port path_rule_1",
            ]
        );
    }

    #[test]
    fn test_default_route_frontends() {
        let mut settings = Settings::default();
        settings.ssl.default_ssl_cert = Some(CERT.into());
        settings.monitor.uri = Some("/ping".into());
        let topology = Topology::from_services(vec![(
            "web",
            ServiceDefinition::default().with_route(Route::new("web_1", "10.0.0.2", "80")),
        )]);
        let material = tls::aggregate(&settings, &topology);

        let frontends = build(&settings, &topology, &material, &HashSet::new(), &[]);
        assert!(frontends.require_default_route);
        let names: Vec<_> = frontends.sections.iter().map(|s| s.name.as_str()).collect();
        // monitor is served from port 80, so no separate monitor frontend
        assert_eq!(names, vec!["frontend default_port_80", "frontend default_port_443"]);
        assert_eq!(
            frontends.sections[0].statements,
            vec![
                "bind :80",
                r"reqadd X-Forwarded-Proto:\ http",
                "monitor-uri /ping",
                "default_backend default_service",
            ]
        );
        assert_eq!(frontends.sections[1].statements[0], "bind :443 ssl crt /certs/");
    }

    #[test]
    fn test_no_routes_left_only_monitor() {
        let mut settings = Settings::default();
        settings.monitor.uri = Some("/ping".into());
        settings.monitor.port = Some("8080".into());
        let route = Route::new("redis_1", "10.0.0.5", "6379");
        let topology = Topology::from_services(vec![(
            "redis",
            ServiceDefinition::default().with_route(route.clone()),
        )]);
        let material = tls::aggregate(&settings, &topology);
        let consumed: HashSet<Route> = [route].into_iter().collect();

        let frontends = build(&settings, &topology, &material, &consumed, &[]);
        assert!(!frontends.require_default_route);
        assert_eq!(frontends.sections.len(), 1);
        assert_eq!(frontends.sections[0].name, "frontend monitor");
        assert_eq!(
            frontends.sections[0].statements,
            vec!["bind :8080", "monitor-uri /ping"]
        );
    }

    #[test]
    fn test_reserved_ports_are_not_rebound() {
        let mut settings = Settings::default();
        settings.ssl.default_ssl_cert = Some(CERT.into());
        settings.monitor.uri = Some("/ping".into());
        settings.monitor.port = Some("1936".into());
        let topology = Topology::from_services(vec![(
            "web",
            ServiceDefinition::default().with_route(Route::new("web_1", "10.0.0.2", "80")),
        )]);
        let material = tls::aggregate(&settings, &topology);

        let frontends = build(&settings, &topology, &material, &HashSet::new(), &[443]);
        assert!(frontends.require_default_route);
        let names: Vec<_> = frontends.sections.iter().map(|s| s.name.as_str()).collect();
        // 443 belongs to a TCP listener and the monitor port to stats
        assert_eq!(names, vec!["frontend default_port_80"]);
    }

    #[test]
    fn test_vhost_on_reserved_port_is_dropped() {
        let settings = Settings::default();
        let topology = vhost_topology(&[("api", "api.example.com:8443"), ("web", "example.com")]);
        let material = tls::aggregate(&settings, &topology);

        let frontends = build(&settings, &topology, &material, &HashSet::new(), &[8443]);
        assert_eq!(frontends.sections.len(), 1);
        assert_eq!(frontends.sections[0].name, "frontend port_80");
        assert!(frontends.sections[0]
            .statements
            .iter()
            .all(|s| !s.contains("SERVICE_api")));
    }
}
