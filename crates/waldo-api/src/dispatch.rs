use waldo_types::{resolve_alias, Backend, Config, ImageData, ResponseFormat};

use crate::backend::{CallOptions, ChunkStream, CompletionBackend, CompletionCall};
use crate::error::DispatchError;
use crate::gemini::GeminiClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

/// Enum-keyed registry of the configured backends.
///
/// Dispatch is a pure routing step: the model identifier selects a backend
/// variant, the call is handed over unchanged, and any failure comes back
/// labelled with the backend that produced it. No I/O happens here.
pub struct Dispatcher {
    ollama: OllamaClient,
    openai: OpenAiClient,
    gemini: GeminiClient,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            ollama: OllamaClient::new(config.ollama_base_url()),
            openai: OpenAiClient::new(config.openai_api_key.clone().unwrap_or_default()),
            gemini: GeminiClient::new(config.googleai_api_key.clone().unwrap_or_default()),
        }
    }

    /// The local backend, for the callers that talk to it directly
    /// (structured extraction, pulls, model listing).
    pub fn local(&self) -> &OllamaClient {
        &self.ollama
    }

    fn registry(&self, backend: Backend) -> &dyn CompletionBackend {
        match backend {
            Backend::OpenAi => &self.openai,
            Backend::Gemini => &self.gemini,
            Backend::Ollama => &self.ollama,
        }
    }

    /// Route a text completion to the backend selected by the model id.
    pub async fn dispatch(
        &self,
        model: &str,
        prompt: &str,
        context: &str,
        format: ResponseFormat,
        opts: &CallOptions,
    ) -> Result<ChunkStream, DispatchError> {
        self.dispatch_call(
            CompletionCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                context: context.to_string(),
                images: Vec::new(),
                format,
            },
            opts,
        )
        .await
    }

    /// Route a multimodal completion; image payloads ride along in order.
    pub async fn dispatch_with_images(
        &self,
        model: &str,
        prompt: &str,
        context: &str,
        images: Vec<ImageData>,
        opts: &CallOptions,
    ) -> Result<ChunkStream, DispatchError> {
        self.dispatch_call(
            CompletionCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                context: context.to_string(),
                images,
                format: ResponseFormat::FreeText,
            },
            opts,
        )
        .await
    }

    async fn dispatch_call(
        &self,
        mut call: CompletionCall,
        opts: &CallOptions,
    ) -> Result<ChunkStream, DispatchError> {
        let backend = Backend::for_model(&call.model);
        call.model = resolve_alias(&call.model).to_string();
        self.registry(backend)
            .submit(&call, opts)
            .await
            .map_err(|source| DispatchError::new(backend, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_types::DEFAULT_OLLAMA_HOST;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(&Config {
            model: "llama2".to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            openai_api_key: None,
            googleai_api_key: None,
        })
    }

    #[test]
    fn registry_is_total_over_model_identifiers() {
        let dispatcher = dispatcher();
        let cases = [
            ("gpt-3.5-turbo", Backend::OpenAi),
            ("gpt-4", Backend::OpenAi),
            ("gpt-4-vision", Backend::OpenAi),
            ("gemini-pro", Backend::Gemini),
            ("gemini-pro-vision", Backend::Gemini),
            ("llama2:13b", Backend::Ollama),
            ("anything-else", Backend::Ollama),
        ];
        for (model, expected) in cases {
            let selected = dispatcher.registry(Backend::for_model(model)).kind();
            assert_eq!(selected, expected, "model {model}");
        }
    }
}
