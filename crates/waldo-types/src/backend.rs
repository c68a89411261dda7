use std::fmt;

/// Inference backends waldo can route a completion to.
///
/// Routing is total: identifiers that match no cloud family fall through to
/// the local self-hosted server, so every model name maps to exactly one
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    OpenAi,
    Gemini,
    Ollama,
}

impl Backend {
    /// Select the backend responsible for a model identifier.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("gpt-") {
            Backend::OpenAi
        } else if model.starts_with("gemini-") {
            Backend::Gemini
        } else {
            Backend::Ollama
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Gemini => "gemini",
            Backend::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve user-facing model aliases to the identifier the provider expects.
pub fn resolve_alias(model: &str) -> &str {
    match model {
        "gpt-4-turbo" => "gpt-4-1106-preview",
        "gpt-4-vision" => "gpt-4-vision-preview",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_families_route_to_their_backend() {
        for model in ["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4-vision"] {
            assert_eq!(Backend::for_model(model), Backend::OpenAi);
        }
        for model in ["gemini-pro", "gemini-pro-vision"] {
            assert_eq!(Backend::for_model(model), Backend::Gemini);
        }
    }

    #[test]
    fn unknown_models_fall_through_to_local() {
        for model in ["llama2", "llama2:13b", "mistral", "llava", "codellama:7b", ""] {
            assert_eq!(Backend::for_model(model), Backend::Ollama);
        }
    }

    #[test]
    fn aliases_resolve_to_provider_identifiers() {
        assert_eq!(resolve_alias("gpt-4-turbo"), "gpt-4-1106-preview");
        assert_eq!(resolve_alias("gpt-4-vision"), "gpt-4-vision-preview");
        assert_eq!(resolve_alias("gpt-4"), "gpt-4");
        assert_eq!(resolve_alias("llama2"), "llama2");
    }
}
