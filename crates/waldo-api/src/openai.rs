use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use waldo_types::{Backend, ChunkTiming, CompletionChunk};

use crate::backend::{CallOptions, ChunkStream, CompletionBackend, CompletionCall};
use crate::error::BackendError;
use crate::sse::SseDecoder;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const VISION_MAX_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageInfo {
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Client for the OpenAI chat-completions API.
///
/// Text calls stream as SSE deltas; vision calls go through the
/// non-streaming variant with inline data-URL image parts and a fixed
/// request budget, matching the provider's recommended usage.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENAI_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn stream_chat(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        let started = Instant::now();
        let request = ChatRequest {
            model: &call.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(call.prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(call.context.clone()),
                },
            ],
            stream: true,
            max_tokens: None,
        };

        let response = self
            .http
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
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
            let mut eval_count = None;
            'events: loop {
                let next = tokio::select! {
                    _ = opts.cancel.cancelled() => Err(BackendError::Cancelled),
                    read = timeout(opts.read_timeout, body.next()) => {
                        read.map_err(|_| BackendError::DeadlineExceeded(opts.read_timeout))
                    }
                }?;
                let bytes = match next {
                    Some(read) => read.map_err(BackendError::Transport)?,
                    // Body closed without the end-of-stream sentinel.
                    None => Err(BackendError::StreamTruncated)?,
                };
                for data in decoder.feed(&bytes) {
                    if data == "[DONE]" {
                        yield CompletionChunk::terminal(
                            "",
                            ChunkTiming {
                                elapsed: started.elapsed(),
                                total_duration: None,
                                eval_count,
                            },
                        );
                        break 'events;
                    }
                    let chunk: StreamChunk =
                        serde_json::from_str(&data).map_err(BackendError::Decode)?;
                    if let Some(usage) = chunk.usage {
                        eval_count = Some(usage.completion_tokens);
                    }
                    if let Some(choice) = chunk.choices.first() {
                        // Empty deltas carry no text; emit nothing for them.
                        if let Some(content) = &choice.delta.content {
                            if !content.is_empty() {
                                yield CompletionChunk::delta(content.clone());
                            }
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn vision_once(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        let started = Instant::now();

        let mut parts = vec![ContentPart::Text {
            text: format!("{} ## {}", call.prompt, call.context),
        }];
        for image in &call.images {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!(
                        "data:image/{};base64,{}",
                        image.mime_subtype,
                        image.to_base64()
                    ),
                },
            });
        }

        let request = ChatRequest {
            model: &call.model,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            }],
            stream: false,
            max_tokens: Some(VISION_MAX_TOKENS),
        };

        let send = self
            .http
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&request)
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
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let chunk = CompletionChunk::terminal(
            content,
            ChunkTiming {
                elapsed: started.elapsed(),
                total_duration: None,
                eval_count: parsed.usage.map(|u| u.completion_tokens),
            },
        );
        let items: Vec<Result<CompletionChunk, BackendError>> = vec![Ok(chunk)];
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    fn kind(&self) -> Backend {
        Backend::OpenAi
    }

    async fn submit(
        &self,
        call: &CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, BackendError> {
        if call.images.is_empty() {
            self.stream_chat(call, opts).await
        } else {
            self.vision_once(call, opts).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_decodes_delta_content() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Hi"},"index":0}],"model":"gpt-4"}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn vision_parts_serialize_with_tagged_types() {
        let parts = vec![
            ContentPart::Text {
                text: "what is this".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,aGk=".to_string(),
                },
            },
        ];
        let value = serde_json::to_value(&parts).unwrap();
        assert_eq!(value[0]["type"], "text");
        assert_eq!(value[1]["type"], "image_url");
        assert_eq!(value[1]["image_url"]["url"], "data:image/png;base64,aGk=");
    }

    #[test]
    fn non_streaming_response_decodes_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"a cat"}}],
                "usage":{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "a cat");
        assert_eq!(parsed.usage.unwrap().completion_tokens, 3);
    }
}
