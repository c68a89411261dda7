use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use waldo_types::{Backend, ChunkTiming, CompletionChunk};

use crate::backend::{CallOptions, ChunkStream, CompletionBackend, CompletionCall};
use crate::error::BackendError;
use crate::sse::SseDecoder;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
enum Part {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "inline_data")]
    InlineData(InlineData),
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StreamResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: String,
}

/// Client for the Gemini generate-content API.
///
/// Requests carry an ordered part list (image parts first, then instruction
/// and context text); responses stream candidate objects whose text parts
/// are concatenated in arrival order.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }

    fn build_parts(call: &CompletionCall) -> Vec<Part> {
        let mut parts = Vec::new();
        for image in &call.images {
            parts.push(Part::InlineData(InlineData {
                mime_type: format!("image/{}", image.mime_subtype),
                data: image.to_base64(),
            }));
        }
        parts.push(Part::Text(call.prompt.clone()));
        if !call.context.is_empty() {
            parts.push(Part::Text(call.context.clone()));
        }
        parts
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn kind(&self) -> Backend {
        Backend::Gemini
    }

    async fn submit(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        let started = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: Self::build_parts(call),
            }],
        };

        let response = self
            .http
            .post(self.stream_url(&call.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
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
            let mut decoder = SseDecoder::new();
            'events: loop {
                let next = tokio::select! {
                    _ = opts.cancel.cancelled() => Err(BackendError::Cancelled),
                    read = timeout(opts.read_timeout, body.next()) => {
                        read.map_err(|_| BackendError::DeadlineExceeded(opts.read_timeout))
                    }
                }?;
                let bytes = match next {
                    Some(read) => read.map_err(BackendError::Transport)?,
                    // Body closed before any candidate reported a finish.
                    None => Err(BackendError::StreamTruncated)?,
                };
                for data in decoder.feed(&bytes) {
                    let event: StreamResponse =
                        serde_json::from_str(&data).map_err(BackendError::Decode)?;
                    let mut finished = false;
                    for candidate in &event.candidates {
                        if let Some(content) = &candidate.content {
                            for part in &content.parts {
                                // Whitespace-only parts carry nothing worth a chunk.
                                if !part.text.trim().is_empty() {
                                    yield CompletionChunk::delta(part.text.clone());
                                }
                            }
                        }
                        if candidate.finish_reason.is_some() {
                            finished = true;
                        }
                    }
                    if finished {
                        yield CompletionChunk::terminal(
                            "",
                            ChunkTiming {
                                elapsed: started.elapsed(),
                                total_duration: None,
                                eval_count: None,
                            },
                        );
                        break 'events;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_types::{ImageData, ResponseFormat};

    #[test]
    fn parts_keep_images_before_text() {
        let call = CompletionCall {
            model: "gemini-pro-vision".to_string(),
            prompt: "describe".to_string(),
            context: "what is this?".to_string(),
            images: vec![ImageData::new(b"hi".to_vec(), "png")],
            format: ResponseFormat::FreeText,
        };
        let value = serde_json::to_value(GeminiClient::build_parts(&call)).unwrap();
        assert_eq!(value[0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(value[0]["inline_data"]["data"], "aGk=");
        assert_eq!(value[1]["text"], "describe");
        assert_eq!(value[2]["text"], "what is this?");
    }

    #[test]
    fn empty_context_is_not_an_empty_part() {
        let call = CompletionCall {
            model: "gemini-pro".to_string(),
            prompt: "p".to_string(),
            ..Default::default()
        };
        assert_eq!(GeminiClient::build_parts(&call).len(), 1);
    }

    #[test]
    fn stream_event_decodes_candidate_parts() {
        let event: StreamResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":"  "}],"role":"model"},
                "finishReason":"STOP"}]}"#,
        )
        .unwrap();
        let candidate = &event.candidates[0];
        assert_eq!(candidate.content.as_ref().unwrap().parts[0].text, "Hello");
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
    }
}
