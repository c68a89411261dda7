use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::time::timeout;
use waldo_types::{
    Backend, CompletionChunk, CompletionRequest, GenerateResponse, ImageData, ModelList,
    PullProgress, PullState,
};

use crate::backend::{CallOptions, ChunkStream, CompletionBackend, CompletionCall};
use crate::error::{BackendError, PullError};
use crate::ndjson::NdjsonDecoder;

/// Client for the local self-hosted inference server.
///
/// The server is a long-lived sibling process reached over HTTP; this client
/// never manages its lifecycle.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_request(call: &CompletionCall) -> CompletionRequest {
        CompletionRequest::new(&call.model, &call.prompt)
            .with_system(&call.context)
            .with_images(call.images.iter().map(ImageData::to_base64).collect())
            .with_format(call.format)
    }

    /// Open a streaming generate call and expose the body as chunks.
    ///
    /// The body is a sequence of concatenated JSON objects; framing is done
    /// by [`NdjsonDecoder`] regardless of how the transport splits reads.
    /// Every read carries a deadline, and a body that closes without a
    /// `done: true` object surfaces `StreamTruncated` instead of hanging.
    pub async fn generate_stream(
        &self,
        request: &CompletionRequest,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        let started = Instant::now();
        let response = self
            .http
            .post(self.endpoint("/api/generate"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let opts = opts.clone();
        let mut body = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut decoder = NdjsonDecoder::new();
            'frames: loop {
                let next = tokio::select! {
                    _ = opts.cancel.cancelled() => Err(BackendError::Cancelled),
                    read = timeout(opts.read_timeout, body.next()) => {
                        read.map_err(|_| BackendError::DeadlineExceeded(opts.read_timeout))
                    }
                }?;
                let bytes = match next {
                    Some(read) => read.map_err(BackendError::Transport)?,
                    // Body closed without a final object.
                    None => Err(BackendError::StreamTruncated)?,
                };
                let frames: Vec<GenerateResponse> =
                    decoder.feed(&bytes).map_err(BackendError::Decode)?;
                for frame in frames {
                    let done = frame.done;
                    yield CompletionChunk::from_generate(frame, started.elapsed());
                    if done {
                        break 'frames;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// One-shot generate call: the whole body is a single completion object.
    pub async fn generate_once(
        &self,
        request: &CompletionRequest,
        opts: &CallOptions,
    ) -> Result<GenerateResponse, BackendError> {
        let send = self
            .http
            .post(self.endpoint("/api/generate"))
            .json(request)
            .send();
        let response = tokio::select! {
            _ = opts.cancel.cancelled() => return Err(BackendError::Cancelled),
            sent = timeout(opts.request_timeout, send) => {
                sent.map_err(|_| BackendError::DeadlineExceeded(opts.request_timeout))??
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Pull a model artifact, reporting each status object as it arrives.
    ///
    /// Returns total elapsed time once the server reports `success`; the
    /// stream ending any other way is an error.
    pub async fn pull(
        &self,
        name: &str,
        opts: &CallOptions,
        mut on_progress: impl FnMut(&PullProgress),
    ) -> Result<Duration, PullError> {
        let started = Instant::now();
        let response = self
            .http
            .post(self.endpoint("/api/pull"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(BackendError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let mut body = response.bytes_stream();
        let mut decoder = NdjsonDecoder::new();
        loop {
            let next = tokio::select! {
                _ = opts.cancel.cancelled() => return Err(BackendError::Cancelled.into()),
                read = timeout(opts.read_timeout, body.next()) => {
                    read.map_err(|_| BackendError::DeadlineExceeded(opts.read_timeout))?
                }
            };
            let Some(read) = next else {
                return Err(BackendError::StreamTruncated.into());
            };
            let bytes = read.map_err(BackendError::Transport)?;
            let frames: Vec<PullProgress> = decoder.feed(&bytes).map_err(BackendError::Decode)?;
            for progress in frames {
                let done = progress.state() == PullState::Success;
                on_progress(&progress);
                if done {
                    return Ok(started.elapsed());
                }
            }
        }
    }

    /// List installed models.
    pub async fn tags(&self) -> Result<ModelList, BackendError> {
        let response = self.http.get(self.endpoint("/api/tags")).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn kind(&self) -> Backend {
        Backend::Ollama
    }

    async fn submit(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        let request = Self::build_request(call);
        self.generate_stream(&request, opts).await
    }
}
