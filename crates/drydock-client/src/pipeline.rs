use std::path::Path;

use drydock_core::{ContentDigest, Manifest, ManifestError, ServiceName};
use drydock_docker::{ArtifactBuilder, BuildError};

use crate::transfer::{Remote, TransferError};

/// What to deploy in one run.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'a> {
    pub descriptor: &'a Path,
    pub service: &'a ServiceName,
    /// Service entry whose image to build; `None` picks the first by name.
    pub entry: Option<&'a str>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub image: String,
    pub local_digest: ContentDigest,
    /// `None` when the server had no descriptor or could not be asked.
    pub remote_digest: Option<ContentDigest>,
    pub descriptor_uploaded: bool,
    pub deploy_output: String,
}

/// Drives build → save → upload → compare → deploy for one service.
pub struct SyncPipeline<B, R> {
    builder: B,
    remote: R,
}

impl<B: ArtifactBuilder, R: Remote> SyncPipeline<B, R> {
    pub fn new(builder: B, remote: R) -> Self {
        Self { builder, remote }
    }

    /// Run every step in order, stopping at the first fatal error.
    ///
    /// Only the remote digest lookup may fail without aborting; the
    /// descriptor is then uploaded as if it had changed. The image archive is
    /// removed on every exit path, including when this future is dropped.
    pub async fn run(&self, request: &SyncRequest<'_>) -> Result<SyncOutcome, SyncError> {
        let service = request.service;

        let manifest = Manifest::read(request.descriptor).await?;
        let image = manifest.image(request.entry)?.to_owned();
        tracing::info!(%service, image, "descriptor read");

        self.builder.build(&image).await?;

        let artifact = self.builder.save(&image).await?;
        tracing::info!(%service, "uploading image");
        self.remote
            .upload_artifact(service, artifact.path())
            .await
            .map_err(SyncError::UploadImage)?;
        if let Err(e) = artifact.discard() {
            tracing::warn!(error = %e, "failed to remove image archive");
        }

        let local_digest = ContentDigest::of_file(request.descriptor)
            .await
            .map_err(SyncError::Fingerprint)?;

        let remote_digest = match self.remote.fetch_remote_digest(service).await {
            Ok(digest) => Some(digest),
            Err(e) if e.is_not_found() => {
                tracing::info!(%service, "no descriptor stored remotely");
                None
            }
            Err(e) => {
                tracing::warn!(%service, error = %e, "could not get remote digest, assuming changed");
                None
            }
        };

        let descriptor_uploaded = remote_digest.as_ref() != Some(&local_digest);
        if descriptor_uploaded {
            tracing::info!(%service, digest = %local_digest, "uploading updated descriptor");
            self.remote
                .upload_descriptor(service, request.descriptor)
                .await
                .map_err(SyncError::UploadDescriptor)?;
        } else {
            tracing::info!(%service, digest = %local_digest, "no changes in descriptor");
        }

        tracing::info!(%service, "triggering deployment");
        let deploy_output = self
            .remote
            .trigger_deploy(service)
            .await
            .map_err(SyncError::Deploy)?;

        Ok(SyncOutcome {
            image,
            local_digest,
            remote_digest,
            descriptor_uploaded,
            deploy_output,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid descriptor")]
    Descriptor(#[from] ManifestError),

    #[error(transparent)]
    Image(#[from] BuildError),

    #[error("image upload failed")]
    UploadImage(#[source] TransferError),

    #[error("failed to fingerprint descriptor")]
    Fingerprint(#[source] drydock_core::Error),

    #[error("descriptor upload failed")]
    UploadDescriptor(#[source] TransferError),

    #[error("deployment failed")]
    Deploy(#[source] TransferError),
}
