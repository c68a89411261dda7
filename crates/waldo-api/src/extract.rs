use waldo_types::{CompletionRequest, ImageQuery, ResponseFormat};

use crate::backend::CallOptions;
use crate::error::ExtractionError;
use crate::ollama::OllamaClient;

/// Model used for extraction when the session's model is not a local one.
pub const DEFAULT_EXTRACT_MODEL: &str = "llama2:13b";

// Instructional prefix pinning the exact JSON shape. The model is expected
// to honor it; malformed output is a terminal error for the call, not
// something to coerce or retry.
const EXTRACT_PROMPT: &str = r#"The input has an instruction or a query, and also one or more image files. Parse and
return the JSON response with the following format:
--
{
    "query": <instruction/query from the user or an empty string "">,
    "images": <the path of one or more image files in an array [] or an empty array []>
}
--
If the image files are not provided the images is an empty array []. If there is no question
or instruction the query is an empty string "".
##
"#;

/// Turn a freeform utterance into `{instruction, file_references}` using one
/// constrained, non-streaming call against the local backend.
///
/// Transport/outer-decode failures and schema failures of the model-produced
/// payload surface as distinct [`ExtractionError`] variants.
pub async fn extract_image_query(
    ollama: &OllamaClient,
    model: &str,
    utterance: &str,
    opts: &CallOptions,
) -> Result<ImageQuery, ExtractionError> {
    if utterance.trim().is_empty() {
        return Ok(ImageQuery {
            instruction: String::new(),
            file_references: Vec::new(),
        });
    }

    let request = CompletionRequest::new(model, format!("{EXTRACT_PROMPT}{utterance}"))
        .with_format(ResponseFormat::StructuredJson)
        .non_streaming();
    let frame = ollama.generate_once(&request, opts).await?;
    parse_query_payload(&frame.response)
}

fn parse_query_payload(payload: &str) -> Result<ImageQuery, ExtractionError> {
    serde_json::from_str(payload).map_err(ExtractionError::Schema)
}
