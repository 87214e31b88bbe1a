//! Raznet Chat: a browser chat front end for a local Ollama server that can
//! ground its answers in an uploaded document.

pub mod chat;
pub mod config;
pub mod documents;
pub mod error;
pub mod http;
pub mod llm;
pub mod logger;
pub mod session;
