use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The part of a stack file drydock cares about: service entries and their images.
///
/// Everything else in the document is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    services: BTreeMap<String, ServiceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ServiceEntry {
    image: Option<String>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(bytes).map_err(ManifestError::Parse)
    }

    pub async fn read(path: &Path) -> Result<Self, ManifestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ManifestError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&bytes)
    }

    /// Image reference to build.
    ///
    /// With `entry`, that service entry must exist and carry an image. Without
    /// it, the lexicographically first entry that has an image wins.
    pub fn image(&self, entry: Option<&str>) -> Result<&str, ManifestError> {
        match entry {
            Some(name) => {
                let service = self
                    .services
                    .get(name)
                    .ok_or_else(|| ManifestError::UnknownEntry(name.to_owned()))?;
                non_empty(service.image.as_deref()).ok_or(ManifestError::NoImage)
            }
            None => self
                .services
                .values()
                .find_map(|s| non_empty(s.image.as_deref()))
                .ok_or(ManifestError::NoImage),
        }
    }

    /// Names of all service entries, in selection order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

fn non_empty(image: Option<&str>) -> Option<&str> {
    image.map(str::trim).filter(|i| !i.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read descriptor {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("descriptor is not valid YAML")]
    Parse(#[source] serde_yaml::Error),

    #[error("no image found in descriptor")]
    NoImage,

    #[error("descriptor has no service entry named '{0}'")]
    UnknownEntry(String),
}
