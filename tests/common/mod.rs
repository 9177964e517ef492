//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use haproxy_synth::compiler::CertificateSet;
use haproxy_synth::reload::{ReloadError, Reloader};
use haproxy_synth::storage::{ArtifactStore, StorageError};
use haproxy_synth::topology::{Route, ServiceDefinition, ServiceDetails, Topology};

pub const CERT_A: &str = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
pub const CERT_B: &str = "-----BEGIN CERTIFICATE-----\nBBBB\n-----END CERTIFICATE-----\n";

/// Reloader counting calls, optionally failing every one.
#[derive(Clone, Default)]
pub struct CountingReloader {
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingReloader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reloader for CountingReloader {
    fn reload(&mut self) -> Result<(), ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReloadError::EmptyCommand);
        }
        Ok(())
    }
}

/// In-memory store recording every write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub configs: Arc<Mutex<Vec<String>>>,
    pub cert_writes: Arc<Mutex<Vec<usize>>>,
    pub cacert_writes: Arc<Mutex<Vec<usize>>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn config_writes(&self) -> usize {
        self.configs.lock().unwrap().len()
    }

    pub fn cert_writes(&self) -> usize {
        self.cert_writes.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Write {
                path: "/haproxy.cfg".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        Ok(())
    }
}

impl ArtifactStore for MemoryStore {
    fn write_config(&self, text: &str) -> Result<(), StorageError> {
        self.check()?;
        self.configs.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn write_certs(&self, certs: &CertificateSet) -> Result<(), StorageError> {
        self.check()?;
        self.cert_writes.lock().unwrap().push(certs.len());
        Ok(())
    }

    fn write_cacerts(&self, cacerts: &CertificateSet) -> Result<(), StorageError> {
        self.check()?;
        self.cacert_writes.lock().unwrap().push(cacerts.len());
        Ok(())
    }
}

/// Builder for test topologies.
#[derive(Default)]
pub struct TopologyBuilder {
    services: Vec<(String, ServiceDefinition)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(
        mut self,
        alias: &str,
        details: ServiceDetails,
        routes: &[(&str, &str, &str)],
    ) -> Self {
        let mut definition = ServiceDefinition::new(details);
        for (name, addr, port) in routes {
            definition = definition.with_route(Route::new(*name, *addr, *port));
        }
        self.services.push((alias.to_string(), definition));
        self
    }

    pub fn http(self, alias: &str, routes: &[(&str, &str, &str)]) -> Self {
        self.service(alias, ServiceDetails::default(), routes)
    }

    pub fn vhost(self, alias: &str, vhost: &str, routes: &[(&str, &str, &str)]) -> Self {
        self.service(
            alias,
            ServiceDetails {
                virtual_host: Some(vhost.to_string()),
                ..Default::default()
            },
            routes,
        )
    }

    pub fn tcp(self, alias: &str, ports: &[&str], routes: &[(&str, &str, &str)]) -> Self {
        self.service(
            alias,
            ServiceDetails {
                tcp_ports: ports.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
            routes,
        )
    }

    /// Services in reverse insertion order, for permutation checks.
    pub fn reversed(mut self) -> Self {
        self.services.reverse();
        self
    }

    pub fn build(self) -> Topology {
        Topology::from_services(self.services)
    }
}
