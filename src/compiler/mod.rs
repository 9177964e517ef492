//! Topology-to-configuration compiler.
//!
//! # Data Flow
//! ```text
//! Settings + Topology
//!     → tls.rs (certificate sets, ssl bind suffix)
//!     → tcp.rs (listen port_<N>, consumed routes)
//!     → frontend.rs (vhost or default frontends, monitor)
//!     → backend.rs (SERVICE_<alias> / default_service)
//!     → document.rs (policy-ordered sections, canonical text)
//! ```
//!
//! # Design Decisions
//! - Pure: no I/O, same inputs always give the same bytes
//! - Section order is fixed: global, defaults, stats, userlist, tcp,
//!   frontends, backends
//! - A port is bound once; stats wins over tcp, tcp over frontends
//! - Every iteration goes through ordered maps, never hash order

pub mod backend;
pub mod document;
pub mod frontend;
pub mod port;
pub mod sections;
pub mod tcp;
pub mod tls;

pub use document::{ConfigDocument, Section};
pub use tls::{Certificate, CertificateSet, TlsMaterial};

use crate::config::Settings;
use crate::topology::Topology;

/// Result of compiling one topology snapshot.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub document: ConfigDocument,
    pub tls: TlsMaterial,
    pub require_default_route: bool,
}

impl Compiled {
    /// Canonical configuration text.
    pub fn text(&self) -> String {
        self.document.render()
    }
}

/// Compile a topology into an ordered configuration document.
pub fn compile(settings: &Settings, topology: &Topology) -> Compiled {
    let tls = tls::aggregate(settings, topology);

    let mut document = ConfigDocument::new();
    document.insert(sections::global(settings));
    document.insert(sections::defaults(settings));
    document.insert(sections::stats(settings));

    let userlist = sections::userlist(settings);
    let basic_auth = userlist.is_some();
    if let Some(userlist) = userlist {
        document.insert(userlist);
    }

    let listeners = tcp::build(settings, topology, &tls);
    document.extend(listeners.sections);

    let frontends = frontend::build(
        settings,
        topology,
        &tls,
        &listeners.routes_added,
        &listeners.ports,
    );
    document.extend(frontends.sections);

    document.extend(backend::build(
        settings,
        topology,
        &listeners.routes_added,
        frontends.require_default_route,
        basic_auth,
    ));

    tracing::debug!(
        sections = document.len(),
        routes = topology.route_count(),
        tcp_routes = listeners.routes_added.len(),
        require_default_route = frontends.require_default_route,
        "Compiled configuration"
    );

    Compiled {
        document,
        tls,
        require_default_route: frontends.require_default_route,
    }
}
