//! HTTP request handlers

use axum::extract::{Multipart, Query, State};
use drydock_core::ServiceName;
use drydock_docker::ContainerRuntime;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::error::ServerError;
use crate::state::AppState;

/// `?service=<name>`, required on every endpoint.
#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    service: Option<String>,
}

impl ServiceQuery {
    fn service(&self) -> Result<ServiceName, ServerError> {
        Ok(ServiceName::parse(
            self.service.as_deref().unwrap_or_default(),
        )?)
    }
}

/// `POST /image`: Spool the `image` field to a temp file and load it.
pub async fn load_image<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Query(query): Query<ServiceQuery>,
    mut multipart: Multipart,
) -> Result<String, ServerError> {
    let service = query.service()?;

    let (file, archive) = tempfile::Builder::new()
        .prefix("image-")
        .suffix(".tar")
        .tempfile()
        .map_err(ServerError::Spool)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let bytes = copy_field(&mut multipart, "image", &mut file).await?;
    file.flush().await.map_err(ServerError::Spool)?;
    drop(file);
    tracing::info!(%service, bytes, "image received");

    // `archive` is removed when it drops, whether or not the load succeeds.
    let _guard = state.locks.acquire(&service).await;
    let output = state.runtime.load_image(&archive).await?;
    tracing::info!(%service, output = %output.trim(), "image loaded");
    Ok(output)
}

/// `POST /deploy-file`: Replace the stored descriptor with the `file` field.
pub async fn store_descriptor<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Query(query): Query<ServiceQuery>,
    mut multipart: Multipart,
) -> Result<&'static str, ServerError> {
    let service = query.service()?;

    let mut pending = state.store.begin(&service).await?;
    let bytes = copy_field(&mut multipart, "file", pending.file_mut()).await?;

    let _guard = state.locks.acquire(&service).await;
    let path = pending.commit().await?;
    tracing::info!(%service, bytes, path = %path.display(), "deployment file saved");
    Ok("Deployment file uploaded")
}

/// `GET /hash`: Digest of the stored descriptor.
pub async fn descriptor_digest<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Query(query): Query<ServiceQuery>,
) -> Result<String, ServerError> {
    let service = query.service()?;

    let _guard = state.locks.acquire(&service).await;
    match state.store.digest(&service).await? {
        Some(digest) => Ok(digest.to_string()),
        None => Err(ServerError::NotFound(service)),
    }
}

/// `POST /deploy`: Apply the stored descriptor.
pub async fn deploy<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Query(query): Query<ServiceQuery>,
) -> Result<String, ServerError> {
    let service = query.service()?;

    let _guard = state.locks.acquire(&service).await;
    if !state.store.exists(&service).await? {
        return Err(ServerError::NotFound(service));
    }

    let manifest = state.store.descriptor_path(&service);
    let output = state.runtime.apply_manifest(&manifest, &service).await?;
    tracing::info!(%service, output = %output.trim(), "deployment applied");
    Ok(output)
}

/// Stream the first multipart field called `name` into `file`.
///
/// Other fields are skipped. Returns the number of bytes written.
async fn copy_field(
    multipart: &mut Multipart,
    name: &'static str,
    file: &mut tokio::fs::File,
) -> Result<u64, ServerError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }

        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await.map_err(ServerError::Spool)?;
            written += chunk.len() as u64;
        }
        return Ok(written);
    }
    Err(ServerError::MissingField(name))
}
