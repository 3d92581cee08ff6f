//! Receiving side of drydock.
//!
//! | Method | Path | Does |
//! |--------|------|------|
//! | POST | `/image?service=` | spool multipart `image` to a temp file, `docker load` it |
//! | POST | `/deploy-file?service=` | replace `<data_dir>/<service>/deploy.yml` with multipart `file` |
//! | GET | `/hash?service=` | hex SHA-256 of the stored descriptor |
//! | POST | `/deploy?service=` | `docker stack deploy` the stored descriptor |
//!
//! Requests for the same service are serialized; different services run in
//! parallel.

pub mod error;
pub mod handlers;
pub mod lock;
pub mod state;
pub mod store;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use drydock_core::ServerConfig;
use drydock_docker::{ContainerRuntime, DockerRuntime};
use tower_http::trace::TraceLayer;

pub use error::ServerError;
pub use lock::{ServiceGuard, ServiceLocks};
pub use state::AppState;
pub use store::{DescriptorStore, PendingDescriptor, StoreError};

/// Router over any runtime.
pub fn router<R: ContainerRuntime>(state: AppState<R>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/image", post(handlers::load_image::<R>))
        .route("/deploy-file", post(handlers::store_descriptor::<R>))
        .route("/hash", get(handlers::descriptor_digest::<R>))
        .route("/deploy", post(handlers::deploy::<R>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Production router: docker CLI runtime, descriptors under `config.data_dir`.
pub fn app(config: &ServerConfig) -> Router {
    let state = AppState::new(
        DescriptorStore::new(&config.data_dir),
        DockerRuntime::new(config),
    );
    router(state, config.body_limit())
}
