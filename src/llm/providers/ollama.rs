//! Ollama provider (`/api/generate`, `/api/tags`).
//!
//! One non-streaming round-trip per call. All Ollama wire types are private
//! to this module. No request timeout is set beyond reqwest's defaults and
//! nothing is retried.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{Generation, ProviderError};

/// Adapter for a local Ollama server.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// `base_url` is the server root without a trailing slash,
    /// e.g. `http://localhost:11434`.
    pub fn new(base_url: String, model: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url, model })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Availability check: `GET /api/tags`, up only on a 200.
    pub async fn ping(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            debug!(%url, error = %e, "ollama availability check failed");
            ProviderError::Request(e.to_string())
        })?;
        let status = response.status();
        debug!(%url, %status, "ollama availability check answered");
        Ok(status == StatusCode::OK)
    }

    pub async fn generate(&self, request: &Generation<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = GenerateRequest {
            model: &self.model,
            prompt: request.prompt,
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %self.model,
            temperature = payload.temperature,
            max_tokens = payload.max_tokens,
            prompt_len = request.prompt.len(),
            "sending generate request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full generate payload");
        }

        let response = self.client.post(&url).json(&payload).send().await.map_err(|e| {
            error!(%url, error = %e, "generate request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%status, %body, "generate request returned HTTP error");
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        let parsed = response.json::<GenerateResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize generate response");
            ProviderError::Decode(e.to_string())
        })?;

        debug!(reply_len = parsed.response.len(), "received generate response");
        Ok(parsed.response)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::{get, post}};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(base_url: String) -> OllamaProvider {
        OllamaProvider::new(base_url, "deepseek-r1:1.5b".into()).unwrap()
    }

    fn request(prompt: &str) -> Generation<'_> {
        Generation { prompt, temperature: 0.3, max_tokens: 800 }
    }

    #[tokio::test]
    async fn generate_sends_fields_verbatim() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let sink = seen.clone();
        let router = Router::new().route(
            "/api/generate",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(json!({ "response": "4", "done": true }))
                }
            }),
        );
        let p = provider(spawn(router).await);

        let reply = p.generate(&request("What is 2+2?")).await.unwrap();
        assert_eq!(reply, "4");

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["model"], "deepseek-r1:1.5b");
        assert_eq!(body["prompt"], "What is 2+2?");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 800);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn generate_non_success_is_status_error() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (AxumStatus::NOT_FOUND, "model 'x' not found") }),
        );
        let p = provider(spawn(router).await);

        match p.generate(&request("hi")).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "model 'x' not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_missing_response_field_is_decode_error() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "done": true })) }),
        );
        let p = provider(spawn(router).await);
        assert!(matches!(p.generate(&request("hi")).await, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn generate_unreachable_is_request_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let p = provider(format!("http://{addr}"));
        assert!(matches!(p.generate(&request("hi")).await, Err(ProviderError::Request(_))));
        assert!(p.ping().await.is_err());
    }

    #[tokio::test]
    async fn ping_is_true_only_on_200() {
        let up = Router::new().route("/api/tags", get(|| async { Json(json!({ "models": [] })) }));
        assert!(provider(spawn(up).await).ping().await.unwrap());

        let degraded = Router::new().route(
            "/api/tags",
            get(|| async { AxumStatus::SERVICE_UNAVAILABLE }),
        );
        assert!(!provider(spawn(degraded).await).ping().await.unwrap());
    }
}
