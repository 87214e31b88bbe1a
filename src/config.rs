//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit path), then applies `RAZNET_BIND`, `RAZNET_LOG_LEVEL` and
//! `OLLAMA_BASE_URL` env overrides.

use std::{
    env, fs,
    path::Path,
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;
use crate::session::settings::{MaxTokens, Settings, Temperature};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the chat page and API are served on.
    pub bind: String,
    /// Largest document an upload may carry, in raw file bytes.
    pub max_upload_bytes: usize,
}

/// How long idle sessions are kept, from the `[session]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetime {
    /// A session untouched for this long is dropped.
    pub idle_timeout: Duration,
    /// How often the store is swept for idle sessions.
    pub sweep_interval: Duration,
}

/// Ollama provider configuration, populated from `[llm.ollama]`.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`. Endpoint paths are appended.
    pub base_url: String,
    /// Model name passed in every generate request.
    pub model: String,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"ollama"` or `"dummy"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub ollama: OllamaConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    /// Settings every new session starts with.
    pub session_defaults: Settings,
    pub session_lifetime: SessionLifetime,
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    session: RawSession,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bot_name")]
    bot_name: String,
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_upload_bytes")]
    max_upload_bytes: usize,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            bind: default_bind(),
            log_level: default_log_level(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    ollama: RawOllama,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), ollama: RawOllama::default() }
    }
}

#[derive(Deserialize)]
struct RawOllama {
    #[serde(default = "default_ollama_base_url")]
    base_url: String,
    #[serde(default = "default_ollama_model")]
    model: String,
}

impl Default for RawOllama {
    fn default() -> Self {
        Self { base_url: default_ollama_base_url(), model: default_ollama_model() }
    }
}

#[derive(Deserialize)]
struct RawSession {
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_true")]
    show_thinking: bool,
    #[serde(default = "default_idle_timeout_secs")]
    idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,
}

impl Default for RawSession {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            show_thinking: true,
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_bot_name() -> String { "Raznet".to_string() }
fn default_bind() -> String { "127.0.0.1:8501".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_max_upload_bytes() -> usize { 200 * 1024 * 1024 }
fn default_llm_provider() -> String { "ollama".to_string() }
fn default_ollama_base_url() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "deepseek-r1:1.5b".to_string() }
fn default_temperature() -> f32 { Temperature::DEFAULT }
fn default_max_tokens() -> u32 { MaxTokens::DEFAULT }
fn default_true() -> bool { true }
fn default_idle_timeout_secs() -> u64 { 60 * 60 }
fn default_sweep_interval_secs() -> u64 { 60 }

/// Env-var overrides, read once by [`load`] and passed explicitly to
/// [`load_from`] so tests never mutate the process environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub ollama_base_url: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            bind: env::var("RAZNET_BIND").ok(),
            log_level: env::var("RAZNET_LOG_LEVEL").ok(),
            ollama_base_url: env::var("OLLAMA_BASE_URL").ok(),
        }
    }
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        &Overrides::from_env(),
    )
}

/// Internal loader: accepts an explicit path and overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.server;
    let session = parsed.session;

    let session_defaults = Settings::new(session.temperature, session.max_tokens, session.show_thinking)
        .map_err(|e| AppError::Config(format!("[session] in {}: {e}", path.display())))?;

    for (key, value) in [
        ("idle_timeout_secs", session.idle_timeout_secs),
        ("sweep_interval_secs", session.sweep_interval_secs),
    ] {
        if value == 0 {
            return Err(AppError::Config(format!(
                "[session] {key} in {} must be at least 1",
                path.display()
            )));
        }
    }
    let session_lifetime = SessionLifetime {
        idle_timeout: Duration::from_secs(session.idle_timeout_secs),
        sweep_interval: Duration::from_secs(session.sweep_interval_secs),
    };

    let base_url = overrides
        .ollama_base_url
        .clone()
        .unwrap_or(parsed.llm.ollama.base_url);

    Ok(Config {
        bot_name: s.bot_name,
        log_level: overrides.log_level.clone().unwrap_or(s.log_level),
        server: ServerConfig {
            bind: overrides.bind.clone().unwrap_or(s.bind),
            max_upload_bytes: s.max_upload_bytes,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            ollama: OllamaConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                model: parsed.llm.ollama.model,
            },
        },
        session_defaults,
        session_lifetime,
    })
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// `Config` for tests: dummy LLM, ephemeral bind, default session settings.
impl Config {
    pub fn test_default() -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                max_upload_bytes: default_max_upload_bytes(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                ollama: OllamaConfig {
                    base_url: "http://127.0.0.1:0".into(),
                    model: "test-model".into(),
                },
            },
            session_defaults: Settings::default(),
            session_lifetime: SessionLifetime {
                idle_timeout: Duration::from_secs(default_idle_timeout_secs()),
                sweep_interval: Duration::from_secs(default_sweep_interval_secs()),
            },
        }
    }
}
