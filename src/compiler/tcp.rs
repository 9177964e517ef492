//! TCP listener sections.
//!
//! # Responsibilities
//! - Collect port tokens from every service
//! - Group services sharing a port number into one `listen` section
//! - Merge balance, options, and extra settings across those services
//! - Record every route consumed here so HTTP backends skip it
//!
//! # Design Decisions
//! - One section per port number, ascending numeric order
//! - The stats port is never rebound; its routes stay with HTTP backends
//! - When tokens disagree on TLS for one port, the first in alias order wins
//! - Unparsable tokens are skipped with a warning

use std::collections::{BTreeMap, HashSet};

use crate::compiler::backend::server_line;
use crate::compiler::document::Section;
use crate::compiler::port::TcpPortSpec;
use crate::compiler::tls::TlsMaterial;
use crate::config::escape::split_settings;
use crate::config::Settings;
use crate::topology::{Route, Topology};

/// TCP sections plus the routes they consumed.
#[derive(Debug, Default)]
pub struct TcpListeners {
    pub sections: Vec<Section>,
    pub routes_added: HashSet<Route>,
    /// Ports bound by `sections`, ascending.
    pub ports: Vec<u16>,
}

struct PortGroup<'a> {
    spec: TcpPortSpec,
    services: Vec<&'a str>,
}

/// Build one `listen port_<N>` section per distinct port.
pub fn build(settings: &Settings, topology: &Topology, tls: &TlsMaterial) -> TcpListeners {
    let groups = group_ports(topology);
    let mut listeners = TcpListeners::default();

    for (port, group) in groups {
        if settings.stats.port.trim() == port.to_string() {
            tracing::warn!(port, services = ?group.services, "TCP port clashes with the stats listener, skipping");
            continue;
        }

        let mut statements = vec![
            format!("bind :{}", group.spec.bind_string(tls, settings).trim()),
            "mode tcp".to_string(),
        ];

        if let Some(balance) = group
            .services
            .iter()
            .filter_map(|alias| topology.service(alias))
            .find_map(|s| s.balance.as_deref().filter(|b| !b.trim().is_empty()))
        {
            statements.push(format!("balance {}", balance.trim()));
        }

        let mut options: Vec<String> = Vec::new();
        let mut extras: Vec<String> = Vec::new();
        for details in group.services.iter().filter_map(|alias| topology.service(alias)) {
            for option in details.option.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
                let statement = format!("option {}", option);
                if !options.contains(&statement) {
                    options.push(statement);
                }
            }
            for extra in details.extra_settings.as_deref().map(split_settings).unwrap_or_default() {
                if !extras.contains(&extra) {
                    extras.push(extra);
                }
            }
        }
        statements.extend(options);
        statements.extend(extras);

        let port_str = port.to_string();
        let mut servers = Vec::new();
        for alias in &group.services {
            let health_check = topology
                .service(alias)
                .and_then(|s| s.health_check.as_deref())
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(settings.defaults.health_check.as_str());
            let routes = topology.routes().get(*alias).map(Vec::as_slice).unwrap_or_default();
            for route in routes.iter().filter(|r| r.port.trim() == port_str) {
                servers.push(server_line(route, health_check, false));
                listeners.routes_added.insert(route.clone());
            }
        }
        servers.sort();
        servers.dedup();
        statements.extend(servers);

        tracing::debug!(port, services = ?group.services, "Built TCP listener");
        listeners.ports.push(port);
        listeners
            .sections
            .push(Section::new(format!("listen port_{}", port), statements));
    }

    listeners
}

fn group_ports(topology: &Topology) -> BTreeMap<u16, PortGroup<'_>> {
    let mut groups: BTreeMap<u16, PortGroup<'_>> = BTreeMap::new();

    for (alias, details) in topology.services() {
        for token in &details.tcp_ports {
            let spec = match TcpPortSpec::parse(token) {
                Ok(spec) => spec,
                Err(e) => {
                    tracing::warn!(service = %alias, error = %e, "Skipping TCP port");
                    continue;
                }
            };

            match groups.get_mut(&spec.port) {
                Some(group) => {
                    if group.spec.mode != spec.mode {
                        tracing::warn!(
                            port = spec.port,
                            kept = %group.spec.token,
                            ignored = %spec.token,
                            "Conflicting TLS modes for one port"
                        );
                    }
                    if !group.services.contains(&alias.as_str()) {
                        group.services.push(alias.as_str());
                    }
                }
                None => {
                    groups.insert(
                        spec.port,
                        PortGroup {
                            spec,
                            services: vec![alias.as_str()],
                        },
                    );
                }
            }
        }
    }

    groups
}
