mod deploy;
mod hash;
mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use drydock_core::{DrydockConfig, ServiceName};

pub use deploy::deploy;
pub use hash::hash;
pub use status::status;

/// Command-line values that take precedence over drydock.toml.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub server: Option<String>,
    pub context: Option<PathBuf>,
}

impl Overrides {
    pub fn load(&self) -> anyhow::Result<DrydockConfig> {
        let mut config = match &self.config {
            Some(path) => DrydockConfig::load_file(path)?,
            None => DrydockConfig::load(Path::new("."))?,
        };
        if let Some(server) = &self.server {
            config.remote.url.clone_from(server);
        }
        if let Some(context) = &self.context {
            config.build.context.clone_from(context);
        }
        Ok(config)
    }
}

pub(crate) fn service_name(raw: &str) -> anyhow::Result<ServiceName> {
    ServiceName::parse(raw).with_context(|| format!("invalid service name '{raw}'"))
}

/// Resolves when the process is asked to stop (Ctrl-C, or SIGTERM on unix),
/// with the signal's name.
pub(crate) async fn termination() -> anyhow::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                Ok("Ctrl-C")
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        Ok("Ctrl-C")
    }
}
