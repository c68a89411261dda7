//! Backend clients and the inference dispatch layer for waldo
//!
//! This crate owns the protocol handling: per-provider request/response
//! codecs, the streaming completion clients, the model-keyed dispatcher, the
//! structured query extractor and the artifact pull monitor.

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod ndjson;
pub mod ollama;
pub mod openai;
pub mod sse;

pub use backend::{CallOptions, ChunkStream, CompletionBackend, CompletionCall};
pub use dispatch::Dispatcher;
pub use error::{BackendError, DispatchError, ExtractionError, PullError};
pub use extract::{extract_image_query, DEFAULT_EXTRACT_MODEL};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
