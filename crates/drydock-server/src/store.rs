use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drydock_core::{ContentDigest, DESCRIPTOR_FILE_NAME, ServiceName};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// On-disk descriptors, one `<root>/<service>/deploy.yml` per service.
///
/// Writes never touch the live file directly: a new descriptor is written
/// next to it and renamed over it, so readers see either the old or the new
/// content in full.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    root: PathBuf,
}

impl DescriptorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn descriptor_path(&self, service: &ServiceName) -> PathBuf {
        service.dir_in(&self.root).join(DESCRIPTOR_FILE_NAME)
    }

    /// Start writing a replacement descriptor for `service`.
    ///
    /// The content is spooled in the data root; the service directory is only
    /// created on [`PendingDescriptor::commit`], so an abandoned upload leaves
    /// nothing behind. Spool names start with `.`, which no service name can.
    pub async fn begin(&self, service: &ServiceName) -> Result<PendingDescriptor, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::CreateDir {
                path: self.root.clone(),
                source: e,
            })?;

        let (file, temp) = tempfile::Builder::new()
            .prefix(".deploy-")
            .suffix(".yml.tmp")
            .tempfile_in(&self.root)
            .map_err(|e| StoreError::Write {
                path: self.root.clone(),
                source: e,
            })?
            .into_parts();

        Ok(PendingDescriptor {
            file: tokio::fs::File::from_std(file),
            temp,
            dir: service.dir_in(&self.root),
            dest: self.descriptor_path(service),
        })
    }

    /// Digest of the stored descriptor, `None` if there is none.
    pub async fn digest(&self, service: &ServiceName) -> Result<Option<ContentDigest>, StoreError> {
        let path = self.descriptor_path(service);
        match ContentDigest::of_file(&path).await {
            Ok(digest) => Ok(Some(digest)),
            Err(drydock_core::Error::Fingerprint { source, .. })
                if source.kind() == ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(StoreError::Read { path, source: e }),
        }
    }

    pub async fn exists(&self, service: &ServiceName) -> Result<bool, StoreError> {
        let path = self.descriptor_path(service);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::Stat { path, source: e })
    }
}

/// A descriptor being written. Dropping it without committing discards it.
#[derive(Debug)]
pub struct PendingDescriptor {
    file: tokio::fs::File,
    temp: TempPath,
    dir: PathBuf,
    dest: PathBuf,
}

impl PendingDescriptor {
    pub fn file_mut(&mut self) -> &mut tokio::fs::File {
        &mut self.file
    }

    /// Flush, fsync, and rename over the live descriptor, creating the service
    /// directory if this is its first descriptor.
    pub async fn commit(mut self) -> Result<PathBuf, StoreError> {
        let temp_path = self.temp.to_path_buf();
        self.file.flush().await.map_err(|e| StoreError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        self.file.sync_all().await.map_err(|e| StoreError::Write {
            path: temp_path,
            source: e,
        })?;
        drop(self.file);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::CreateDir {
                path: self.dir.clone(),
                source: e,
            })?;
        self.temp
            .persist(&self.dest)
            .map_err(|e| StoreError::Replace {
                path: self.dest.clone(),
                source: e.error,
            })?;
        Ok(self.dest)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to replace {path}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: drydock_core::Error,
    },

    #[error("failed to check {path}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
}
