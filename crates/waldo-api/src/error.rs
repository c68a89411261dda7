use std::time::Duration;

use thiserror::Error;
use waldo_types::Backend;

/// Failures a single backend call can produce.
///
/// Remote-service faults are reported once and end the call; nothing in this
/// crate retries or panics on them.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend rejected request with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream closed before a terminal chunk")]
    StreamTruncated,

    #[error("no data arrived within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("call cancelled")]
    Cancelled,
}

/// A backend failure labelled with the backend that produced it, so callers
/// can tell "unreachable" from "rejected" per provider.
#[derive(Debug, Error)]
#[error("{backend} backend: {source}")]
pub struct DispatchError {
    pub backend: Backend,
    #[source]
    pub source: BackendError,
}

impl DispatchError {
    pub fn new(backend: Backend, source: BackendError) -> Self {
        Self { backend, source }
    }
}

/// Structured extraction failures. The two decode layers are distinct: the
/// transport payload itself, and the model-produced JSON inside it.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("local backend call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("model output does not match the query schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Artifact pull failures.
#[derive(Debug, Error)]
pub enum PullError {
    #[error("pull stream failed: {0}")]
    Backend(#[from] BackendError),
}
