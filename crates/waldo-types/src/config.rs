/// Default address for the locally spawned inference server. A non-standard
/// port keeps waldo's instance from colliding with a system-wide one.
pub const DEFAULT_OLLAMA_HOST: &str = "127.0.0.1:11435";

/// Model used when neither the CLI nor the environment names one.
pub const DEFAULT_MODEL: &str = "llama2";

/// Ambient configuration collected once at startup.
///
/// API keys are opaque strings consumed by the backend clients; waldo does
/// not manage credentials beyond carrying them.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub model: String,
    pub ollama_host: String,
    pub openai_api_key: Option<String>,
    pub googleai_api_key: Option<String>,
}

impl Config {
    pub fn ollama_base_url(&self) -> String {
        format!("http://{}", self.ollama_host)
    }
}

/// Mutable per-session state.
///
/// The currently selected model lives here instead of in a process global so
/// each session owns its selection; writes happen only through
/// [`Session::switch_model`], keeping the single-writer discipline explicit.
#[derive(Debug, Clone)]
pub struct Session {
    model: String,
}

impl Session {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn switch_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_prefixes_scheme() {
        let config = Config {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            ..Default::default()
        };
        assert_eq!(config.ollama_base_url(), "http://127.0.0.1:11435");
    }

    #[test]
    fn session_switch_replaces_model() {
        let mut session = Session::new("llama2");
        assert_eq!(session.model(), "llama2");
        session.switch_model("gpt-4");
        assert_eq!(session.model(), "gpt-4");
    }
}
