//! Core types and configuration for drydock.
//!
//! This crate defines the `drydock.toml` schema ([`DrydockConfig`]), the
//! validated [`ServiceName`], descriptor parsing ([`Manifest`]), content
//! fingerprinting ([`ContentDigest`]), and shared error types.

pub mod config;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod service;

pub use config::{BuildConfig, DrydockConfig, RemoteConfig, ServerConfig};
pub use digest::{ContentDigest, DigestParseError};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestError};
pub use service::{ServiceName, ServiceNameError};

/// File name of the deployment descriptor stored per service on the server.
pub const DESCRIPTOR_FILE_NAME: &str = "deploy.yml";
