use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "drydock.toml";

/// drydock.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrydockConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the client sends artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the receiving server
    #[serde(default = "default_remote_url")]
    pub url: String,
    /// Timeout for digest requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for artifact and descriptor uploads, in seconds
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
    /// Timeout for the deploy request, in seconds.
    ///
    /// The server may hold this request behind another request for the same
    /// service (such as a `docker load`) and then run `docker stack deploy`
    /// for up to its own `[server].command_timeout_secs`. Keep this at least
    /// twice that value or a slow but successful rollout is reported as a
    /// timeout.
    #[serde(default = "default_deploy_timeout_secs")]
    pub deploy_timeout_secs: u64,
}

/// How the client builds and saves images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Docker build context directory
    #[serde(default = "default_context")]
    pub context: PathBuf,
    /// Docker CLI binary
    #[serde(default = "default_docker")]
    pub docker: String,
    /// Timeout for `docker build`, in seconds
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,
    /// Timeout for `docker save`, in seconds
    #[serde(default = "default_save_timeout_secs")]
    pub save_timeout_secs: u64,
}

/// Receiving server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Root directory holding `<service>/deploy.yml`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Docker CLI binary
    #[serde(default = "default_docker")]
    pub docker: String,
    /// Timeout for `docker load` and `docker stack deploy`, in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            timeout_secs: default_request_timeout_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
            deploy_timeout_secs: default_deploy_timeout_secs(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            docker: default_docker(),
            build_timeout_secs: default_build_timeout_secs(),
            save_timeout_secs: default_save_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: default_data_dir(),
            docker: default_docker(),
            command_timeout_secs: default_command_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl RemoteConfig {
    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }
}

impl BuildConfig {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }
}

impl ServerConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// `max_upload_bytes` as a body limit, saturating where `usize` is narrower.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

impl DrydockConfig {
    /// Load from drydock.toml in the given directory, or return defaults if not found.
    pub fn load(dir: &Path) -> crate::Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from an explicit path. A missing file is an error.
    pub fn load_file(config_path: &Path) -> crate::Result<Self> {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.to_path_buf(),
                source: e,
            })?;
        toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }
}

fn default_remote_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_upload_timeout_secs() -> u64 {
    1800
}

fn default_deploy_timeout_secs() -> u64 {
    2 * default_command_timeout_secs()
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_docker() -> String {
    "docker".to_owned()
}

fn default_build_timeout_secs() -> u64 {
    3600
}

fn default_save_timeout_secs() -> u64 {
    900
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("deployments")
}

fn default_command_timeout_secs() -> u64 {
    900
}

fn default_max_upload_bytes() -> u64 {
    8 << 30
}
