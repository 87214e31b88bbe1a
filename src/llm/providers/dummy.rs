//! Dummy LLM provider: echoes the prompt back prefixed with `[echo]`.
//! Lets the page run end to end without an Ollama install.

use crate::llm::{Generation, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn generate(&self, request: &Generation<'_>) -> Result<String, ProviderError> {
        Ok(format!("[echo] {}", request.prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> Generation<'_> {
        Generation { prompt, temperature: 0.7, max_tokens: 500 }
    }

    #[tokio::test]
    async fn generate_prefixes_echo() {
        assert_eq!(DummyProvider.generate(&request("hello")).await.unwrap(), "[echo] hello");
    }

    #[tokio::test]
    async fn generate_empty_prompt() {
        assert_eq!(DummyProvider.generate(&request("")).await.unwrap(), "[echo] ");
    }
}
