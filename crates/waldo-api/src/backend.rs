use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;
use waldo_types::{Backend, CompletionChunk, ImageData, ResponseFormat};

use crate::error::BackendError;

/// Ordered, lazily produced sequence of completion chunks. Never restarted;
/// chunks are observed strictly in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, BackendError>> + Send>>;

/// Deadline and cancellation threaded through every backend call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Maximum wait for the next piece of a streaming body.
    pub read_timeout: Duration,
    /// Whole-call budget for the non-streaming cloud requests.
    pub request_timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }
}

impl CallOptions {
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }
}

/// A normalized completion request, backend-agnostic.
///
/// `prompt` carries the instruction/system text and `context` the user
/// content; each backend maps the pair onto its own wire shape.
#[derive(Debug, Clone, Default)]
pub struct CompletionCall {
    pub model: String,
    pub prompt: String,
    pub context: String,
    pub images: Vec<ImageData>,
    pub format: ResponseFormat,
}

/// Capability interface every inference backend satisfies: submit one
/// request, get back a stream of chunks ending in exactly one terminal chunk.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn kind(&self) -> Backend;

    async fn submit(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError>;
}
