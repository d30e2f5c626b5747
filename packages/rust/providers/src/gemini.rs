//! Google Generative Language (`generateContent`) provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use quire_shared::{ProviderSettings, Result, is_usable_key};

use crate::http::{build_client, failure_from_status, failure_from_transport};
use crate::{Provider, ProviderOutcome};

/// Gemini client bound to one model and key.
pub struct GeminiProvider {
    settings: ProviderSettings,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            settings,
            api_key,
            client: build_client()?,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl Provider for GeminiProvider {
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
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        });

        let response = match self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
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

        let parsed: GenerateResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return failure_from_transport(&e),
        };

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return ProviderOutcome::Failure {
                message: format!("empty response from {}", self.settings.name),
                rate_limited: false,
            };
        }

        debug!(chars = text.len(), "gemini response received");
        ProviderOutcome::Success(text)
    }
}
