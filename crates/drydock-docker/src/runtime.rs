use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use drydock_core::{ServerConfig, ServiceName};

use crate::docker::DockerError;
use crate::executor::{CommandExecutor, RealExecutor, args};

/// Server-side container actions: materialize an uploaded image and roll out
/// a stored descriptor.
///
/// Both return the tool's combined output on success.
pub trait ContainerRuntime: Send + Sync + 'static {
    fn load_image(
        &self,
        archive: &Path,
    ) -> impl Future<Output = Result<String, RuntimeError>> + Send;

    fn apply_manifest(
        &self,
        manifest: &Path,
        service: &ServiceName,
    ) -> impl Future<Output = Result<String, RuntimeError>> + Send;
}

/// [`ContainerRuntime`] backed by `docker load` and `docker stack deploy`.
pub struct DockerRuntime<E: CommandExecutor = RealExecutor> {
    executor: E,
    timeout: Duration,
}

impl DockerRuntime<RealExecutor> {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_executor(RealExecutor::new(&config.docker), config.command_timeout())
    }
}

impl<E: CommandExecutor> DockerRuntime<E> {
    pub fn with_executor(executor: E, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: CommandExecutor + 'static> ContainerRuntime for DockerRuntime<E> {
    async fn load_image(&self, archive: &Path) -> Result<String, RuntimeError> {
        let archive = path_str(archive)?;
        self.executor
            .exec(&args(["load", "-i", archive]), self.timeout)
            .await
            .map_err(|e| RuntimeError::Load { source: e })
    }

    async fn apply_manifest(
        &self,
        manifest: &Path,
        service: &ServiceName,
    ) -> Result<String, RuntimeError> {
        let manifest = path_str(manifest)?;
        self.executor
            .exec(
                &args(["stack", "deploy", "-c", manifest, service.as_str()]),
                self.timeout,
            )
            .await
            .map_err(|e| RuntimeError::Apply {
                service: service.clone(),
                source: e,
            })
    }
}

fn path_str(path: &Path) -> Result<&str, RuntimeError> {
    path.to_str()
        .ok_or_else(|| RuntimeError::InvalidPath(path.to_path_buf()))
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("docker load failed")]
    Load { source: DockerError },

    #[error("docker stack deploy failed for {service}")]
    Apply {
        service: ServiceName,
        source: DockerError,
    },

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}

impl RuntimeError {
    /// Verbatim tool output when available, for response bodies.
    pub fn diagnostic(&self) -> String {
        match self {
            RuntimeError::Load { source } | RuntimeError::Apply { source, .. } => {
                source.diagnostic()
            }
            other => other.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            RuntimeError::Load { source } | RuntimeError::Apply { source, .. } => {
                source.is_timeout()
            }
            RuntimeError::InvalidPath(_) => false,
        }
    }
}
