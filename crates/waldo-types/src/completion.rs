use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Output shape requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    FreeText,
    StructuredJson,
}

impl ResponseFormat {
    pub fn is_free_text(&self) -> bool {
        matches!(self, ResponseFormat::FreeText)
    }
}

// On the wire the local server expects "" or "json"; free text is omitted
// entirely via skip_serializing_if on the request field.
impl Serialize for ResponseFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseFormat::FreeText => serializer.serialize_str(""),
            ResponseFormat::StructuredJson => serializer.serialize_str("json"),
        }
    }
}

impl<'de> Deserialize<'de> for ResponseFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "" => Ok(ResponseFormat::FreeText),
            "json" => Ok(ResponseFormat::StructuredJson),
            other => Err(de::Error::custom(format!(
                "unknown response format {other:?}"
            ))),
        }
    }
}

/// Request body for the local server's generate endpoint.
///
/// Built fresh per call and immutable after serialization. Optional fields
/// are omitted when empty so the wire form stays minimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "ResponseFormat::is_free_text")]
    pub format: ResponseFormat,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: String::new(),
            images: Vec::new(),
            format: ResponseFormat::FreeText,
            stream: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn non_streaming(mut self) -> Self {
        self.stream = false;
        self
    }
}

/// One decoded object from the local server's generate stream.
///
/// Timing fields are only populated on the terminal (`done: true`) object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateResponse {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

/// Usage/timing metadata attached to the terminal chunk of a stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkTiming {
    /// Wall-clock time from request issuance to the terminal chunk.
    pub elapsed: Duration,
    /// Server-reported total duration, when the backend provides one.
    pub total_duration: Option<Duration>,
    /// Completion token count, when the backend provides one.
    pub eval_count: Option<u64>,
}

/// One unit of an incremental completion.
///
/// Concatenating `text_delta` values in arrival order reconstructs the full
/// response text; exactly one chunk per stream is final, and it is the last.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionChunk {
    pub text_delta: String,
    pub is_final: bool,
    pub timing: Option<ChunkTiming>,
}

impl CompletionChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text_delta: text.into(),
            is_final: false,
            timing: None,
        }
    }

    pub fn terminal(text: impl Into<String>, timing: ChunkTiming) -> Self {
        Self {
            text_delta: text.into(),
            is_final: true,
            timing: Some(timing),
        }
    }

    /// Map a decoded local-server object to a chunk, stamping elapsed time
    /// onto the terminal one.
    pub fn from_generate(frame: GenerateResponse, elapsed: Duration) -> Self {
        if frame.done {
            Self::terminal(
                frame.response,
                ChunkTiming {
                    elapsed,
                    total_duration: frame.total_duration.map(Duration::from_nanos),
                    eval_count: frame.eval_count,
                },
            )
        } else {
            Self::delta(frame.response)
        }
    }
}

/// One installed model reported by the local server's tags endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl ModelList {
    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_field_for_field() {
        let request = CompletionRequest::new("llama2:13b", "hello")
            .with_system("context")
            .with_images(vec!["aGk=".to_string()])
            .with_format(ResponseFormat::StructuredJson);

        let json = serde_json::to_string(&request).unwrap();
        let back: CompletionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn empty_optional_fields_are_omitted_and_round_trip() {
        let request = CompletionRequest::new("llama2", "hi");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("system"));
        assert!(!json.contains("images"));
        assert!(!json.contains("format"));

        let back: CompletionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn structured_format_serializes_as_json_keyword() {
        let request = CompletionRequest::new("llama2", "hi")
            .with_format(ResponseFormat::StructuredJson)
            .non_streaming();
        let value: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn generate_frames_map_to_chunks() {
        let frame: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama2","response":"Hel","done":false}"#).unwrap();
        let chunk = CompletionChunk::from_generate(frame, Duration::from_secs(1));
        assert_eq!(chunk.text_delta, "Hel");
        assert!(!chunk.is_final);
        assert!(chunk.timing.is_none());

        let last: GenerateResponse = serde_json::from_str(
            r#"{"model":"llama2","response":"lo","done":true,"total_duration":2000000000,"eval_count":17}"#,
        )
        .unwrap();
        let chunk = CompletionChunk::from_generate(last, Duration::from_secs(2));
        assert!(chunk.is_final);
        let timing = chunk.timing.unwrap();
        assert_eq!(timing.total_duration, Some(Duration::from_secs(2)));
        assert_eq!(timing.eval_count, Some(17));
    }

    #[test]
    fn model_list_preserves_order() {
        let list: ModelList = serde_json::from_str(
            r#"{"models":[{"name":"llama2:latest","modified_at":"2024-01-01","size":3825819519},
                          {"name":"llava:7b","modified_at":"2024-01-02","size":4109865159}]}"#,
        )
        .unwrap();
        assert_eq!(list.names(), vec!["llama2:latest", "llava:7b"]);
    }
}
