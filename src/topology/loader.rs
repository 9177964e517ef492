//! Topology loading from a TOML or JSON file.
//!
//! The file is the hand-off point from whatever discovers services (an
//! operator, an orchestrator hook, a discovery agent). Shape:
//!
//! ```toml
//! [services.web]
//! virtual_host = "a.example.com"
//! balance = "roundrobin"
//!
//! [[services.web.routes]]
//! container_name = "web_1"
//! addr = "10.0.0.2"
//! port = 80
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::topology::model::{
    Route, ServiceDefinition, ServiceDetails, Topology, TopologyIncompleteError,
};

/// Error type for topology loading.
#[derive(Debug, thiserror::Error)]
pub enum TopologyLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopologyFile {
    services: BTreeMap<String, ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(flatten)]
    details: ServiceDetails,

    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RouteEntry {
    container_name: Option<String>,
    addr: Option<String>,
    port: Option<PortValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u32),
    Text(String),
}

impl PortValue {
    fn into_string(self) -> String {
        match self {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s.trim().to_string(),
        }
    }
}

/// Load a topology file. `.json` files are read as JSON, anything else as TOML.
pub fn load_topology(path: &Path) -> Result<Topology, TopologyLoadError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json(&content)
    } else {
        parse_toml(&content)
    }
}

pub fn parse_toml(content: &str) -> Result<Topology, TopologyLoadError> {
    let file: TopologyFile = toml::from_str(content)?;
    Ok(build(file))
}

pub fn parse_json(content: &str) -> Result<Topology, TopologyLoadError> {
    let file: TopologyFile = serde_json::from_str(content)?;
    Ok(build(file))
}

fn build(file: TopologyFile) -> Topology {
    let services = file.services.into_iter().map(|(alias, entry)| {
        let routes = entry
            .routes
            .into_iter()
            .enumerate()
            .filter_map(|(index, route)| match resolve_route(&alias, index, route) {
                Ok(route) => Some(route),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping route");
                    None
                }
            })
            .collect();
        let definition = ServiceDefinition {
            details: entry.details,
            routes,
        };
        (alias, definition)
    });
    Topology::from_services(services)
}

fn resolve_route(
    alias: &str,
    index: usize,
    entry: RouteEntry,
) -> Result<Route, TopologyIncompleteError> {
    let missing = |field| TopologyIncompleteError::MissingRouteField {
        alias: alias.to_string(),
        index,
        field,
    };

    let addr = entry
        .addr
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| missing("addr"))?;
    let port = entry
        .port
        .map(PortValue::into_string)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| missing("port"))?;
    let container_name = entry
        .container_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{}_{}", alias, index + 1));

    Ok(Route {
        container_name,
        addr: addr.trim().to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let topology = parse_toml(
            r#"
[services.web]
virtual_host = "a.example.com"
option = ["httpclose"]
hsts_max_age = 31536000

[[services.web.routes]]
container_name = "web_1"
addr = "10.0.0.2"
port = 80

[[services.web.routes]]
addr = "10.0.0.3"
port = "80"

[services.redis]
tcp_ports = ["6379"]
"#,
        )
        .unwrap();

        let web = topology.service("web").unwrap();
        assert_eq!(web.option, vec!["httpclose"]);
        assert_eq!(web.hsts_max_age, Some(31536000));
        let routes = &topology.routes()["web"];
        assert_eq!(routes[0], Route::new("web_1", "10.0.0.2", "80"));
        assert_eq!(routes[1], Route::new("web_2", "10.0.0.3", "80"));
        assert_eq!(topology.vhosts().len(), 1);
        assert!(topology.routes()["redis"].is_empty());
    }

    #[test]
    fn test_incomplete_routes_are_dropped() {
        let topology = parse_json(
            r#"{"services": {"web": {"routes": [
                {"container_name": "web_1", "port": 80},
                {"container_name": "web_2", "addr": "10.0.0.3"},
                {"container_name": "web_3", "addr": "10.0.0.4", "port": 8080}
            ]}}}"#,
        )
        .unwrap();
        let routes = &topology.routes()["web"];
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].container_name, "web_3");
        assert_eq!(routes[0].port, "8080");
    }

    #[test]
    fn test_empty_file_is_empty_topology() {
        let topology = parse_toml("").unwrap();
        assert!(topology.services().is_empty());
    }
}
