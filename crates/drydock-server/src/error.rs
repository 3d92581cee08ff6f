use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drydock_core::{ServiceName, ServiceNameError};
use drydock_docker::RuntimeError;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    InvalidService(#[from] ServiceNameError),

    #[error("missing multipart field '{0}'")]
    MissingField(&'static str),

    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("deployment file not found for {0}")]
    NotFound(ServiceName),

    #[error("failed to spool upload")]
    Spool(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidService(_) | ServerError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Multipart(e) => e.status(),
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Spool(_) | ServerError::Store(_) | ServerError::Runtime(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body. Runtime failures return the tool's output unchanged.
    fn body(&self) -> String {
        match self {
            ServerError::Runtime(e) => e.diagnostic(),
            ServerError::Store(e) => error_chain(e),
            ServerError::Spool(e) => format!("{self}: {e}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %error_chain(&self), "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }
        (status, self.body()).into_response()
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}
