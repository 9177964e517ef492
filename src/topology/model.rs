//! Topology snapshot types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::topology::vhost::{self, VirtualHost, VirtualHostError};

/// Per-service attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceDetails {
    /// Raw TCP port tokens (`6379`, `443/ssl`, `ssl:443`).
    pub tcp_ports: Vec<String>,

    /// Comma-separated virtual host entries.
    pub virtual_host: Option<String>,

    /// Balancing algorithm.
    pub balance: Option<String>,

    /// `option` statements.
    pub option: Vec<String>,

    /// Free-form statements (comma separated, `\,` escapes).
    pub extra_settings: Option<String>,

    /// Health-check suffix for `server` lines.
    pub health_check: Option<String>,

    /// Argument for `option httpchk`.
    pub http_check: Option<String>,

    /// `appsession` arguments.
    pub appsession: Option<String>,

    /// `cookie` arguments; also tags each server with its container name.
    pub cookie: Option<String>,

    /// Redirect plain HTTP to HTTPS.
    pub force_ssl: bool,

    /// HSTS max-age in seconds.
    pub hsts_max_age: Option<u32>,

    /// MIME types for gzip compression.
    pub gzip_compression_type: Option<String>,

    /// Certificate served for this service.
    pub ssl_cert: Option<String>,

    /// Certificate contributed as a default route certificate.
    pub default_ssl_cert: Option<String>,
}

/// A running instance serving a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Route {
    pub container_name: String,
    pub addr: String,
    pub port: String,
}

impl Route {
    pub fn new(
        container_name: impl Into<String>,
        addr: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            addr: addr.into(),
            port: port.into(),
        }
    }

    /// `addr:port` as used in `server` statements.
    pub fn address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// A service's attributes together with its routes.
#[derive(Debug, Clone, Default)]
pub struct ServiceDefinition {
    pub details: ServiceDetails,
    pub routes: Vec<Route>,
}

impl ServiceDefinition {
    pub fn new(details: ServiceDetails) -> Self {
        Self {
            details,
            routes: Vec::new(),
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }
}

/// A service or route is missing something the compiler needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyIncompleteError {
    #[error("route #{index} of service `{alias}` has no {field}")]
    MissingRouteField {
        alias: String,
        index: usize,
        field: &'static str,
    },

    #[error("virtual host `{entry}` of service `{alias}` is invalid: {source}")]
    InvalidVirtualHost {
        alias: String,
        entry: String,
        #[source]
        source: VirtualHostError,
    },
}

/// Resolved snapshot of services, routes, and virtual hosts for one cycle.
///
/// Services and routes are keyed by alias in a `BTreeMap`, so every
/// iteration is in lexicographic alias order regardless of input order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    services: BTreeMap<String, ServiceDetails>,
    routes: BTreeMap<String, Vec<Route>>,
    vhosts: Vec<VirtualHost>,
}

impl Topology {
    /// Build a topology. Later duplicates of an alias replace earlier ones.
    pub fn from_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = (S, ServiceDefinition)>,
        S: Into<String>,
    {
        let mut details = BTreeMap::new();
        let mut routes = BTreeMap::new();
        for (alias, definition) in services {
            let alias = alias.into();
            details.insert(alias.clone(), definition.details);
            routes.insert(alias, definition.routes);
        }

        let vhosts = collect_vhosts(&details);
        Self {
            services: details,
            routes,
            vhosts,
        }
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceDetails> {
        &self.services
    }

    pub fn service(&self, alias: &str) -> Option<&ServiceDetails> {
        self.services.get(alias)
    }

    pub fn service_aliases(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn routes(&self) -> &BTreeMap<String, Vec<Route>> {
        &self.routes
    }

    pub fn vhosts(&self) -> &[VirtualHost] {
        &self.vhosts
    }

    /// Resolve an attribute for `alias`, or for the pseudo-alias `None`
    /// the first service in alias order that declares it.
    pub fn attribute<'a, T, F>(&'a self, alias: Option<&str>, get: F) -> Option<T>
    where
        F: Fn(&'a ServiceDetails) -> Option<T>,
    {
        match alias {
            Some(alias) => self.services.get(alias).and_then(get),
            None => self.services.values().find_map(get),
        }
    }

    /// Certificates declared as default route certificates.
    pub fn default_ssl_certs(&self) -> Vec<&str> {
        self.services
            .values()
            .filter_map(|s| s.default_ssl_cert.as_deref())
            .collect()
    }

    /// Per-service certificates.
    pub fn ssl_certs(&self) -> Vec<&str> {
        self.services
            .values()
            .filter_map(|s| s.ssl_cert.as_deref())
            .collect()
    }

    /// Total number of routes across services.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }
}

fn collect_vhosts(services: &BTreeMap<String, ServiceDetails>) -> Vec<VirtualHost> {
    let mut vhosts = Vec::new();
    for (alias, details) in services {
        let Some(value) = details.virtual_host.as_deref() else {
            continue;
        };
        for (entry, parsed) in vhost::parse_list(alias, value) {
            match parsed {
                Ok(vhost) => {
                    if vhosts.contains(&vhost) {
                        tracing::debug!(service = %alias, entry = %entry, "Skipping duplicate virtual host");
                    } else {
                        vhosts.push(vhost);
                    }
                }
                Err(source) => {
                    let err = TopologyIncompleteError::InvalidVirtualHost {
                        alias: alias.clone(),
                        entry,
                        source,
                    };
                    tracing::warn!(error = %err, "Dropping virtual host");
                }
            }
        }
    }
    vhosts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(balance: Option<&str>) -> ServiceDefinition {
        ServiceDefinition::new(ServiceDetails {
            balance: balance.map(String::from),
            ..Default::default()
        })
    }

    #[test]
    fn test_aliases_are_sorted() {
        let topology = Topology::from_services(vec![
            ("zeta", service(None)),
            ("alpha", service(None)),
        ]);
        let aliases: Vec<_> = topology.service_aliases().collect();
        assert_eq!(aliases, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_attribute_pseudo_alias_takes_first_declared() {
        let topology = Topology::from_services(vec![
            ("a", service(None)),
            ("b", service(Some("source"))),
            ("c", service(Some("leastconn"))),
        ]);
        let balance = topology.attribute(None, |s| s.balance.as_deref());
        assert_eq!(balance, Some("source"));
        assert_eq!(topology.attribute(Some("c"), |s| s.balance.as_deref()), Some("leastconn"));
        assert_eq!(topology.attribute(Some("missing"), |s| s.balance.as_deref()), None);
    }

    #[test]
    fn test_invalid_vhost_is_dropped() {
        let details = ServiceDetails {
            virtual_host: Some("a.com, b.com:notaport".into()),
            ..Default::default()
        };
        let topology = Topology::from_services(vec![("web", ServiceDefinition::new(details))]);
        assert_eq!(topology.vhosts().len(), 1);
        assert_eq!(topology.vhosts()[0].host, "a.com");
    }

    #[test]
    fn test_duplicate_vhost_is_collapsed() {
        let details = ServiceDetails {
            virtual_host: Some("x.com, x.com, https://x.com".into()),
            ..Default::default()
        };
        let topology = Topology::from_services(vec![("a", ServiceDefinition::new(details))]);
        let ports: Vec<_> = topology.vhosts().iter().map(|v| v.port.as_str()).collect();
        assert_eq!(ports, vec!["80", "443"]);
    }
}
