//! OpenAI-compatible `chat/completions` provider (Groq, OpenRouter, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use quire_shared::{ProviderSettings, Result, is_usable_key};

use crate::http::{build_client, failure_from_status, failure_from_transport};
use crate::{Provider, ProviderOutcome};

/// Chat-completions client bound to one model and key.
pub struct OpenAiProvider {
    settings: ProviderSettings,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            settings,
            api_key,
            client: build_client()?,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    #[instrument(skip_all, fields(provider = %self.settings.name, model = %self.settings.model))]
    async fn generate(&self, prompt: &str) -> ProviderOutcome {
        let key = match self.api_key.as_deref() {
            Some(k) if is_usable_key(Some(k)) => k,
            _ => return ProviderOutcome::NotConfigured,
        };

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        let response = match self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return failure_from_transport(&e),
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return failure_from_status(status, &text);
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return failure_from_transport(&e),
        };

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return ProviderOutcome::Failure {
                message: format!("empty response from {}", self.settings.name),
                rate_limited: false,
            };
        }

        debug!(chars = text.len(), "chat completion received");
        ProviderOutcome::Success(text)
    }
}
