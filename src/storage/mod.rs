//! Artifact persistence.
//!
//! # Responsibilities
//! - Write the rendered configuration file
//! - Write leaf certificates as `cert<i>.pem` and drop stale ones
//! - Write CA certificates concatenated into one `cert0.pem`
//!
//! # Design Decisions
//! - Every file is written to a temp file in the target directory and
//!   renamed over the destination, so readers never see partial files
//! - A trait at this seam lets cycles run against a failing or in-memory
//!   store in tests

pub mod fs;

pub use fs::FsStore;

use std::path::PathBuf;

use crate::compiler::CertificateSet;

/// Failure to persist an artifact.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale certificate {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for everything a cycle produces.
pub trait ArtifactStore {
    /// Replace the configuration file with `text`.
    fn write_config(&self, text: &str) -> Result<(), StorageError>;

    /// Replace the leaf certificate directory contents.
    fn write_certs(&self, certs: &CertificateSet) -> Result<(), StorageError>;

    /// Replace the CA bundle.
    fn write_cacerts(&self, cacerts: &CertificateSet) -> Result<(), StorageError>;
}
