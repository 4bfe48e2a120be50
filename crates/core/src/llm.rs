use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{EduflexError, Result},
    provider::Provider,
};

/// Anything that can turn a prompt into raw model text.
#[async_trait]
pub trait ContentRequester: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
///
/// Built once per process and shared by reference with everything that needs
/// to talk to the model.
pub struct ChatClient {
    http: reqwest::Client,
    provider: Provider,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(provider: Provider) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        Ok(Self {
            http: reqwest::Client::new(),
            provider,
            api_key,
            model: provider.config().model.to_string(),
            temperature: 0.3,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ContentRequester for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let config = self.provider.config();
        debug!(provider = self.provider.name(), model = %self.model, "sending completion request");

        let response = self
            .http
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": self.temperature,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        extract_content(&response)
    }
}

fn extract_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| EduflexError::InvalidApiResponse {
            reason: format!("no completion content in {}", response),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_choice() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "  [1, 2]\n"}}]
        });
        assert_eq!(extract_content(&response).unwrap(), "[1, 2]");
    }

    #[test]
    fn rejects_response_without_choices() {
        let response = json!({"error": {"message": "rate limited"}});
        assert!(matches!(
            extract_content(&response),
            Err(EduflexError::InvalidApiResponse { .. })
        ));
    }
}
