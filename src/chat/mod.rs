//! Question answering against the configured model.
//!
//! [`Assistant::answer`] never fails: every inference problem is turned into
//! a diagnostic string that the page shows in place of the reply.

pub mod prompt;
pub mod thinking;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::llm::{Generation, LlmProvider, ProviderError};
use crate::session::settings::Settings;

/// Reply used when the availability check says the server is down.
pub const CANNOT_CONNECT: &str =
    "Cannot connect to Ollama. Please make sure the Ollama service is running.";

/// Provider plus the process-wide availability cache.
pub struct Assistant {
    provider: LlmProvider,
    /// `None` until the first check; then held for the process lifetime
    /// unless [`Assistant::refresh_availability`] replaces it.
    availability: Mutex<Option<bool>>,
}

impl Assistant {
    pub fn new(provider: LlmProvider) -> Self {
        Self { provider, availability: Mutex::new(None) }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Cached availability, probing once on first use.
    pub async fn is_available(&self) -> bool {
        let mut cached = self.availability.lock().await;
        if let Some(up) = *cached {
            return up;
        }
        let up = self.check_service().await;
        *cached = Some(up);
        up
    }

    /// Last check result without triggering a check.
    pub async fn cached_availability(&self) -> Option<bool> {
        *self.availability.lock().await
    }

    /// Check again and replace the cached value.
    pub async fn refresh_availability(&self) -> bool {
        let mut cached = self.availability.lock().await;
        let up = self.check_service().await;
        *cached = Some(up);
        up
    }

    async fn check_service(&self) -> bool {
        match self.provider.ping().await {
            Ok(up) => {
                info!(provider = self.provider.name(), up, "inference service checked");
                up
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "inference service unreachable");
                false
            }
        }
    }

    /// Answer `question`, grounding it in `context` when that is non-empty.
    ///
    /// The reply is trimmed and, when `settings.show_thinking` is off, cut
    /// down to the text after the thinking segment.
    pub async fn answer(&self, question: &str, context: &str, settings: &Settings) -> String {
        if !self.is_available().await {
            return CANNOT_CONNECT.to_string();
        }

        let prompt = prompt::build(question, context);
        let request = Generation {
            prompt: &prompt,
            temperature: settings.temperature.get(),
            max_tokens: settings.max_tokens.get(),
        };

        let reply = match self.provider.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generation failed; replying with diagnostic");
                diagnostic(&e)
            }
        };

        thinking::visible(reply.trim(), settings.show_thinking).to_string()
    }
}

/// User-facing text for a failed generation.
fn diagnostic(e: &ProviderError) -> String {
    match e {
        ProviderError::Status { status, body } => format!("Error: {status} - {body}"),
        other => format!("Error generating response: {other}"),
    }
}
