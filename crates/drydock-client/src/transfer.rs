use std::path::{Path, PathBuf};
use std::time::Duration;

use drydock_core::{ContentDigest, DigestParseError, RemoteConfig, ServiceName};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use tokio_util::io::ReaderStream;

pub const IMAGE_ENDPOINT: &str = "/image";
pub const DESCRIPTOR_ENDPOINT: &str = "/deploy-file";
pub const DIGEST_ENDPOINT: &str = "/hash";
pub const DEPLOY_ENDPOINT: &str = "/deploy";

/// Operations against the receiving server.
///
/// Production code uses [`TransferClient`]; tests use mockall-generated mocks.
/// Each call is a single request with no retry.
#[allow(async_fn_in_trait)]
pub trait Remote {
    /// Upload an image archive; the server loads it immediately.
    async fn upload_artifact(
        &self,
        service: &ServiceName,
        archive: &Path,
    ) -> Result<(), TransferError>;

    /// Upload a descriptor; the server stores it as the service's current one.
    async fn upload_descriptor(
        &self,
        service: &ServiceName,
        descriptor: &Path,
    ) -> Result<(), TransferError>;

    /// Digest of the stored descriptor. [`TransferError::NotFound`] when none is stored.
    async fn fetch_remote_digest(
        &self,
        service: &ServiceName,
    ) -> Result<ContentDigest, TransferError>;

    /// Re-apply the stored descriptor and return the server's output.
    async fn trigger_deploy(&self, service: &ServiceName) -> Result<String, TransferError>;
}

/// HTTP [`Remote`] implementation.
pub struct TransferClient {
    http: Client,
    base_url: String,
    upload_timeout: Duration,
    deploy_timeout: Duration,
}

impl TransferClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, TransferError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransferError::Client { source: e })?;

        Ok(Self {
            http,
            base_url: config.base_url().to_owned(),
            upload_timeout: config.upload_timeout(),
            deploy_timeout: config.deploy_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Stream a file as the single multipart field `field`.
    async fn upload(
        &self,
        endpoint: &'static str,
        service: &ServiceName,
        path: &Path,
        upload: Upload,
    ) -> Result<(), TransferError> {
        let io_err = |e| TransferError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let len = file.metadata().await.map_err(io_err)?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len)
            .file_name(upload.file_name)
            .mime_str(upload.mime)
            .map_err(|e| TransferError::Client { source: e })?;
        let form = Form::new().part(upload.field, part);

        tracing::debug!(endpoint, %service, bytes = len, "uploading");
        let response = self
            .http
            .post(self.url(endpoint))
            .query(&[("service", service.as_str())])
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;

        let body = check(endpoint, response).await?;
        tracing::debug!(endpoint, %service, response = %body.trim(), "upload accepted");
        Ok(())
    }
}

struct Upload {
    field: &'static str,
    file_name: &'static str,
    mime: &'static str,
}

impl Remote for TransferClient {
    async fn upload_artifact(
        &self,
        service: &ServiceName,
        archive: &Path,
    ) -> Result<(), TransferError> {
        self.upload(
            IMAGE_ENDPOINT,
            service,
            archive,
            Upload {
                field: "image",
                file_name: "image.tar",
                mime: "application/x-tar",
            },
        )
        .await
    }

    async fn upload_descriptor(
        &self,
        service: &ServiceName,
        descriptor: &Path,
    ) -> Result<(), TransferError> {
        self.upload(
            DESCRIPTOR_ENDPOINT,
            service,
            descriptor,
            Upload {
                field: "file",
                file_name: drydock_core::DESCRIPTOR_FILE_NAME,
                mime: "application/yaml",
            },
        )
        .await
    }

    async fn fetch_remote_digest(
        &self,
        service: &ServiceName,
    ) -> Result<ContentDigest, TransferError> {
        let response = self
            .http
            .get(self.url(DIGEST_ENDPOINT))
            .query(&[("service", service.as_str())])
            .send()
            .await
            .map_err(|e| transport(DIGEST_ENDPOINT, e))?;

        let body = check(DIGEST_ENDPOINT, response).await?;
        ContentDigest::parse(&body).map_err(|e| TransferError::InvalidDigest {
            endpoint: DIGEST_ENDPOINT,
            source: e,
        })
    }

    async fn trigger_deploy(&self, service: &ServiceName) -> Result<String, TransferError> {
        let response = self
            .http
            .post(self.url(DEPLOY_ENDPOINT))
            .query(&[("service", service.as_str())])
            .timeout(self.deploy_timeout)
            .send()
            .await
            .map_err(|e| transport(DEPLOY_ENDPOINT, e))?;

        check(DEPLOY_ENDPOINT, response).await
    }
}

/// Read the body and map non-2xx statuses to errors carrying it.
async fn check(endpoint: &'static str, response: Response) -> Result<String, TransferError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport(endpoint, e))?;

    if status.is_success() {
        Ok(body)
    } else if status == StatusCode::NOT_FOUND {
        Err(TransferError::NotFound { endpoint, body })
    } else {
        tracing::debug!(endpoint, %status, body = %body.trim(), "request rejected");
        Err(TransferError::Rejected {
            endpoint,
            status,
            body,
        })
    }
}

fn transport(endpoint: &'static str, e: reqwest::Error) -> TransferError {
    if e.is_timeout() {
        TransferError::Timeout {
            endpoint,
            source: e,
        }
    } else {
        TransferError::Transport {
            endpoint,
            source: e,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to set up HTTP request")]
    Client { source: reqwest::Error },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    #[error("request to {endpoint} timed out")]
    Timeout {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    #[error("{endpoint}: not found: {}", body.trim())]
    NotFound { endpoint: &'static str, body: String },

    #[error("{endpoint} failed with {status}\n{body}")]
    Rejected {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{endpoint} returned an invalid digest")]
    InvalidDigest {
        endpoint: &'static str,
        source: DigestParseError,
    },
}

impl TransferError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransferError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }
}
