use std::env;

use waldo_types::{Config, DEFAULT_MODEL, DEFAULT_OLLAMA_HOST};

use crate::cli::Cli;

/// Collect ambient configuration: CLI flags win over environment variables,
/// which win over the built-in defaults.
pub fn from_env(cli: &Cli) -> Config {
    let model = cli
        .model
        .clone()
        .or_else(|| env::var("MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let ollama_host = cli
        .ollama_host
        .clone()
        .or_else(|| env::var("OLLAMA_HOST").ok())
        .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());

    Config {
        model,
        ollama_host,
        openai_api_key: env::var("OPENAI_API_KEY").ok(),
        googleai_api_key: env::var("GOOGLEAI_API_KEY").ok(),
    }
}
