//! Backend sections.
//!
//! # Responsibilities
//! - Map each service (or the single pseudo-alias when there are no
//!   virtual hosts) to a named backend
//! - Emit per-service directives and `server` lines
//! - Skip routes already served by a TCP listener
//!
//! # Naming
//! ```text
//! pseudo-alias (no vhosts)       → default_service, only if a default route is required
//! alias declaring virtual_host   → SERVICE_<alias>
//! alias without virtual_host     → default_service (later aliases overwrite earlier ones)
//! ```
//!
//! The last rule is a last-writer-wins collapse kept on purpose: two
//! services without virtual hosts never merge their servers.

use std::collections::HashSet;

use crate::compiler::document::{ConfigDocument, Section};
use crate::config::escape::split_settings;
use crate::config::Settings;
use crate::topology::{Route, Topology};

pub const DEFAULT_BACKEND: &str = "default_service";

/// A `server` statement for one route.
pub(crate) fn server_line(route: &Route, health_check: &str, cookie: bool) -> String {
    let mut line = format!("server {} {}", route.container_name, route.address());
    if !health_check.trim().is_empty() {
        line.push(' ');
        line.push_str(health_check.trim());
    }
    if cookie {
        line.push_str(" cookie ");
        line.push_str(&route.container_name);
    }
    line
}

/// Build all backend sections in resolution order.
pub fn build(
    settings: &Settings,
    topology: &Topology,
    routes_added: &HashSet<Route>,
    require_default_route: bool,
    basic_auth: bool,
) -> Vec<Section> {
    let aliases: Vec<Option<&str>> = if topology.vhosts().is_empty() {
        vec![None]
    } else {
        topology.service_aliases().map(Some).collect()
    };

    let mut backends = ConfigDocument::new();
    for alias in aliases {
        let statements = backend_statements(settings, topology, alias, routes_added, basic_auth);

        let name = match alias {
            None if require_default_route => DEFAULT_BACKEND.to_string(),
            None => continue,
            Some(alias) if has_virtual_host(topology, alias) => format!("SERVICE_{}", alias),
            Some(_) => DEFAULT_BACKEND.to_string(),
        };

        let section_name = format!("backend {}", name);
        if backends.insert(Section::new(section_name, statements)).is_some() {
            tracing::debug!(
                backend = %name,
                service = ?alias,
                "Backend overwritten by a later service"
            );
        }
    }

    backends.into_sections()
}

fn has_virtual_host(topology: &Topology, alias: &str) -> bool {
    topology
        .service(alias)
        .and_then(|s| s.virtual_host.as_deref())
        .is_some_and(|v| !v.trim().is_empty())
}

fn backend_statements(
    settings: &Settings,
    topology: &Topology,
    alias: Option<&str>,
    routes_added: &HashSet<Route>,
    basic_auth: bool,
) -> Vec<String> {
    let non_empty = |value: &Option<String>| -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let mut statements = Vec::new();

    if topology.attribute(alias, |s| s.force_ssl.then_some(())).is_some() {
        statements.push("redirect scheme https code 301 if !{ ssl_fc }".to_string());
    }
    if let Some(balance) = topology.attribute(alias, |s| non_empty(&s.balance)) {
        statements.push(format!("balance {}", balance));
    }
    if let Some(appsession) = topology.attribute(alias, |s| non_empty(&s.appsession)) {
        statements.push(format!("appsession {}", appsession));
    }
    let cookie = topology.attribute(alias, |s| non_empty(&s.cookie));
    if let Some(cookie) = &cookie {
        statements.push(format!("cookie {}", cookie));
    }
    if let Some(options) =
        topology.attribute(alias, |s| (!s.option.is_empty()).then_some(&s.option))
    {
        statements.extend(
            options
                .iter()
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .map(|o| format!("option {}", o)),
        );
    }
    if let Some(check) = topology.attribute(alias, |s| non_empty(&s.http_check)) {
        statements.push(format!("option httpchk {}", check));
    }
    if let Some(max_age) = topology.attribute(alias, |s| s.hsts_max_age) {
        statements.push(format!(
            r"rspadd Strict-Transport-Security:\ max-age={};\ includeSubDomains",
            max_age
        ));
    }
    if basic_auth {
        statements.push("acl need_auth http_auth(haproxy_userlist)".to_string());
        statements.push("http-request auth realm haproxy_basic_auth if !need_auth".to_string());
    }
    if let Some(types) = topology.attribute(alias, |s| non_empty(&s.gzip_compression_type)) {
        statements.push("compression algo gzip".to_string());
        statements.push(format!("compression type {}", types));
    }
    if let Some(extra) = topology.attribute(alias, |s| non_empty(&s.extra_settings)) {
        statements.extend(split_settings(&extra));
    }

    let health_check = topology
        .attribute(alias, |s| non_empty(&s.health_check))
        .unwrap_or_else(|| settings.defaults.health_check.clone());
    statements.extend(server_lines(
        topology,
        alias,
        routes_added,
        &health_check,
        cookie.is_some(),
    ));

    statements
}

fn server_lines(
    topology: &Topology,
    alias: Option<&str>,
    routes_added: &HashSet<Route>,
    health_check: &str,
    cookie: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (service, routes) in topology.routes() {
        if alias.is_some_and(|a| a != service.as_str()) {
            continue;
        }
        let mut addresses = HashSet::new();
        for route in routes.iter().filter(|r| !routes_added.contains(*r)) {
            if addresses.insert(route.address()) {
                lines.push(server_line(route, health_check, cookie));
            }
        }
    }
    lines.sort();
    lines
}
