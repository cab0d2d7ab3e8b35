use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

fn chat_body(model: &str, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "stream": false,
        "options": {
            "temperature": temperature,
            "num_predict": max_tokens,
        },
    })
}

fn extract_content(resp: &Value) -> Result<String, LlmError> {
    resp["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        debug!(url = %url, model = %self.model, "ollama request");

        let response = self
            .client
            .post(&url)
            .json(&chat_body(&self.model, &messages, temperature, max_tokens))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let resp: Value = response.json().await?;
        extract_content(&resp)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
