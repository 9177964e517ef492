//! Filesystem artifact store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::compiler::CertificateSet;
use crate::config::PathsConfig;
use crate::storage::{ArtifactStore, StorageError};

const CA_BUNDLE: &str = "cert0.pem";

/// Store writing to the paths configured in [`PathsConfig`].
#[derive(Debug, Clone)]
pub struct FsStore {
    config_file: PathBuf,
    cert_dir: PathBuf,
    cacert_dir: PathBuf,
}

impl FsStore {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            config_file: paths.config_file.clone(),
            cert_dir: paths.cert_dir.clone(),
            cacert_dir: paths.cacert_dir.clone(),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}

impl ArtifactStore for FsStore {
    fn write_config(&self, text: &str) -> Result<(), StorageError> {
        write_atomic(&self.config_file, text.as_bytes())?;
        tracing::info!(path = %self.config_file.display(), bytes = text.len(), "Configuration written");
        Ok(())
    }

    fn write_certs(&self, certs: &CertificateSet) -> Result<(), StorageError> {
        create_dir(&self.cert_dir)?;
        for (index, cert) in certs.iter().enumerate() {
            let path = self.cert_dir.join(format!("cert{}.pem", index));
            write_atomic(&path, cert.pem().as_bytes())?;
        }
        remove_stale(&self.cert_dir, certs.len())?;
        tracing::info!(dir = %self.cert_dir.display(), count = certs.len(), "Certificates written");
        Ok(())
    }

    fn write_cacerts(&self, cacerts: &CertificateSet) -> Result<(), StorageError> {
        create_dir(&self.cacert_dir)?;
        let mut bundle = String::new();
        for cert in cacerts.iter() {
            bundle.push_str(cert.pem());
            if !bundle.ends_with('\n') {
                bundle.push('\n');
            }
        }
        write_atomic(&self.cacert_dir.join(CA_BUNDLE), bundle.as_bytes())?;
        tracing::info!(dir = %self.cacert_dir.display(), count = cacerts.len(), "CA certificates written");
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `contents` to a temp file beside `path`, then rename it into place.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Remove `cert<i>.pem` files with `i >= keep`.
fn remove_stale(dir: &Path, keep: usize) -> Result<(), StorageError> {
    let entries = fs::read_dir(dir).map_err(|source| StorageError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(index) = name
            .to_str()
            .and_then(|n| n.strip_prefix("cert"))
            .and_then(|n| n.strip_suffix(".pem"))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        if index >= keep {
            let path = entry.path();
            fs::remove_file(&path).map_err(|source| StorageError::Remove {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "Removed stale certificate");
        }
    }
    Ok(())
}
