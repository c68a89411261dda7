use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

/// Structured intent extracted from a freeform utterance.
///
/// `instruction` is never null (empty string when the utterance carried no
/// question) and `file_references` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ImageQueryWire")]
pub struct ImageQuery {
    pub instruction: String,
    pub file_references: Vec<String>,
}

/// Wire shape for the extractor's JSON payload.
///
/// Current prompts produce `{query, images}`; older ones produced
/// `{query, filepath}` with a single path. The plural field wins when both
/// are present, and a lone `filepath` is wrapped into a one-element list.
#[derive(Deserialize)]
struct ImageQueryWire {
    #[serde(default)]
    query: String,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    filepath: Option<String>,
}

impl From<ImageQueryWire> for ImageQuery {
    fn from(wire: ImageQueryWire) -> Self {
        let file_references = match wire.images {
            Some(images) => images,
            None => wire
                .filepath
                .filter(|p| !p.is_empty())
                .map(|p| vec![p])
                .unwrap_or_default(),
        };
        ImageQuery {
            instruction: wire.query,
            file_references,
        }
    }
}

impl ImageQuery {
    pub fn has_files(&self) -> bool {
        !self.file_references.is_empty()
    }
}

/// Raw image bytes plus the MIME subtype sniffed from them.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_subtype: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_subtype: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_subtype: mime_subtype.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_current_plural_shape() {
        let query: ImageQuery = serde_json::from_str(
            r#"{"query":"what is in this picture?","images":["a.jpg","b.png"]}"#,
        )
        .unwrap();
        assert_eq!(query.instruction, "what is in this picture?");
        assert_eq!(query.file_references, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn decodes_legacy_singular_shape() {
        let query: ImageQuery =
            serde_json::from_str(r#"{"query":"describe","filepath":"cat.jpg"}"#).unwrap();
        assert_eq!(query.file_references, vec!["cat.jpg"]);
    }

    #[test]
    fn plural_field_wins_over_singular() {
        let query: ImageQuery = serde_json::from_str(
            r#"{"query":"q","images":["a.jpg"],"filepath":"ignored.jpg"}"#,
        )
        .unwrap();
        assert_eq!(query.file_references, vec!["a.jpg"]);
    }

    #[test]
    fn empty_payload_yields_empty_fields() {
        let query: ImageQuery = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(query.instruction, "");
        assert!(query.file_references.is_empty());
        assert!(!query.has_files());

        let query: ImageQuery =
            serde_json::from_str(r#"{"query":"","images":[],"filepath":""}"#).unwrap();
        assert!(query.file_references.is_empty());
    }

    #[test]
    fn image_data_encodes_to_base64() {
        let data = ImageData::new(b"hi".to_vec(), "png");
        assert_eq!(data.to_base64(), "aGk=");
    }
}
