//! Docker operations for drydock.
//!
//! ```text
//! client                               server
//!   docker build -t <image> <context>    docker load -i <tmp.tar>
//!   docker save -o <tmp.tar> <image>     docker stack deploy -c deploy.yml <service>
//! ```
//!
//! Every invocation goes through a [`CommandExecutor`] with a timeout, and
//! failures carry the tool's output verbatim. Image archives live in
//! [`ImageArtifact`]s, which remove their file when dropped.

pub mod builder;
pub mod docker;
pub mod executor;
pub mod runtime;

pub use builder::{ArtifactBuilder, BuildError, DockerBuilder, ImageArtifact};
pub use docker::DockerError;
pub use executor::{CommandExecutor, RealExecutor};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
