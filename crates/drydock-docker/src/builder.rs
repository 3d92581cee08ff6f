use std::path::{Path, PathBuf};
use std::time::Duration;

use drydock_core::BuildConfig;
use tempfile::TempPath;

use crate::docker::DockerError;
use crate::executor::{CommandExecutor, RealExecutor, args};

/// Produces a transferable image archive from an image reference.
///
/// The sync pipeline is written against this trait; tests substitute mocks.
#[allow(async_fn_in_trait)]
pub trait ArtifactBuilder {
    /// Build the image under `image`, streaming build output to the console.
    async fn build(&self, image: &str) -> Result<(), BuildError>;

    /// Save the built image into a transient archive.
    async fn save(&self, image: &str) -> Result<ImageArtifact, BuildError>;
}

/// An image archive on local disk.
///
/// The file is removed when the artifact is dropped, whichever way the
/// owning code exits.
#[derive(Debug)]
pub struct ImageArtifact {
    image: String,
    path: TempPath,
}

impl ImageArtifact {
    /// Reserve a fresh, empty archive path in the system temp directory.
    pub fn reserve(image: &str) -> std::io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("drydock-image-")
            .suffix(".tar")
            .tempfile()?
            .into_temp_path();
        Ok(Self::from_temp_path(image, path))
    }

    pub fn from_temp_path(image: &str, path: TempPath) -> Self {
        Self {
            image: image.to_owned(),
            path,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the archive now and report whether removal worked.
    pub fn discard(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// [`ArtifactBuilder`] backed by the docker CLI.
pub struct DockerBuilder<E: CommandExecutor = RealExecutor> {
    executor: E,
    context: PathBuf,
    build_timeout: Duration,
    save_timeout: Duration,
}

impl DockerBuilder<RealExecutor> {
    pub fn new(config: &BuildConfig) -> Self {
        Self::with_executor(RealExecutor::new(&config.docker), config)
    }
}

impl<E: CommandExecutor> DockerBuilder<E> {
    pub fn with_executor(executor: E, config: &BuildConfig) -> Self {
        Self {
            executor,
            context: config.context.clone(),
            build_timeout: config.build_timeout(),
            save_timeout: config.save_timeout(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: CommandExecutor> ArtifactBuilder for DockerBuilder<E> {
    async fn build(&self, image: &str) -> Result<(), BuildError> {
        let context = self
            .context
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(self.context.clone()))?;

        tracing::info!(image, context, "building image");
        self.executor
            .exec_streaming(&args(["build", "-t", image, context]), self.build_timeout)
            .await
            .map_err(|e| BuildError::Build {
                image: image.to_owned(),
                source: e,
            })
    }

    async fn save(&self, image: &str) -> Result<ImageArtifact, BuildError> {
        let artifact = ImageArtifact::reserve(image).map_err(BuildError::TempFile)?;
        let target = artifact
            .path()
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(artifact.path().to_path_buf()))?;

        tracing::info!(image, path = %target, "saving image");
        self.executor
            .exec_streaming(&args(["save", "-o", target, image]), self.save_timeout)
            .await
            .map_err(|e| BuildError::Save {
                image: image.to_owned(),
                source: e,
            })?;

        Ok(artifact)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("docker build failed for {image}")]
    Build { image: String, source: DockerError },

    #[error("docker save failed for {image}")]
    Save { image: String, source: DockerError },

    #[error("failed to create temporary image archive")]
    TempFile(#[source] std::io::Error),

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}
