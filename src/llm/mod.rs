//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities: clone them freely.
//! The enum's `async fn`s delegate to the active provider, so callers need no
//! trait-object machinery.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    /// Transport-level failure: connection refused, DNS, reset, client build.
    #[error("provider request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The server answered 2xx but the body was not the expected shape.
    #[error("failed to parse response body: {0}")]
    Decode(String),
}

// ── Request ───────────────────────────────────────────────────────────────────

/// One non-streaming generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Ollama(providers::ollama::OllamaProvider),
}

impl LlmProvider {
    /// Send one prompt and return the raw reply text.
    pub async fn generate(&self, request: &Generation<'_>) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.generate(request).await,
            LlmProvider::Ollama(p) => p.generate(request).await,
        }
    }

    /// Ask the backend whether it is up. `Ok(false)` means it answered with a
    /// non-200 status; `Err` means it could not be reached at all.
    pub async fn ping(&self) -> Result<bool, ProviderError> {
        match self {
            LlmProvider::Dummy(_) => Ok(true),
            LlmProvider::Ollama(p) => p.ping().await,
        }
    }

    /// Provider name for health output and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Ollama(_) => "ollama",
        }
    }

    /// Model identifier sent with each request, if the provider has one.
    pub fn model(&self) -> Option<&str> {
        match self {
            LlmProvider::Dummy(_) => None,
            LlmProvider::Ollama(p) => Some(p.model()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display_carries_code_and_body() {
        let e = ProviderError::Status { status: 404, body: "model not found".into() };
        assert_eq!(e.to_string(), "HTTP 404: model not found");
    }

    #[tokio::test]
    async fn dummy_is_always_available() {
        let p = LlmProvider::Dummy(providers::dummy::DummyProvider);
        assert!(p.ping().await.unwrap());
        assert_eq!(p.name(), "dummy");
        assert!(p.model().is_none());
    }
}
