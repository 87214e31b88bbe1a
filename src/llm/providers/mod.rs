//! LLM provider implementations.
//!
//! `build(config)` is the factory: called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod ollama;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config.
pub fn build(config: &LlmConfig) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "ollama" => {
            let p = ollama::OllamaProvider::new(
                config.ollama.base_url.clone(),
                config.ollama.model.clone(),
            )?;
            Ok(LlmProvider::Ollama(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}
