//! Text-generation providers and the ordered fallback chain.
//!
//! Every provider shares one result contract, [`ProviderOutcome`]. The
//! [`ProviderChain`] walks providers in configured order and returns the
//! first usable text; it never reorders and never calls two providers at once.

mod http;

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use quire_shared::{ProviderCredentials, ProviderKind, Result};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Result of one provider call. Never partially successful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Usable generated text.
    Success(String),
    /// The call failed; `rate_limited` marks HTTP 429 / quota phrasing.
    Failure { message: String, rate_limited: bool },
    /// No usable credential; the chain skips this provider silently.
    NotConfigured,
}

/// A named text-generation service.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name reported in logs and summaries.
    fn name(&self) -> &str;

    /// Generate text for `prompt`. Must not panic or return partial text.
    async fn generate(&self, prompt: &str) -> ProviderOutcome;
}

/// Text accepted from the first successful provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub provider: String,
}

/// Ordered provider list with early-return fallback.
pub struct ProviderChain {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Build HTTP providers for every configured entry, in order.
    pub fn from_credentials(credentials: &[ProviderCredentials]) -> Result<Self> {
        let mut providers: Vec<Box<dyn Provider>> = Vec::with_capacity(credentials.len());
        for cred in credentials {
            let provider: Box<dyn Provider> = match cred.settings.kind {
                ProviderKind::Gemini => Box::new(GeminiProvider::new(
                    cred.settings.clone(),
                    cred.api_key.clone(),
                )?),
                ProviderKind::Openai => Box::new(OpenAiProvider::new(
                    cred.settings.clone(),
                    cred.api_key.clone(),
                )?),
            };
            providers.push(provider);
        }
        Ok(Self::new(providers))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider in order until one succeeds.
    ///
    /// `None` means every provider was unconfigured or failed. Callers treat
    /// that as a hard failure for the item; the chain does not retry.
    #[instrument(skip_all, fields(prompt_chars = prompt.len()))]
    pub async fn call_with_fallback(&self, prompt: &str) -> Option<ProviderReply> {
        for provider in &self.providers {
            match provider.generate(prompt).await {
                ProviderOutcome::Success(text) => {
                    debug!(provider = provider.name(), "provider succeeded");
                    return Some(ProviderReply {
                        text,
                        provider: provider.name().to_string(),
                    });
                }
                ProviderOutcome::NotConfigured => continue,
                ProviderOutcome::Failure {
                    rate_limited: true,
                    message,
                } => {
                    info!(provider = provider.name(), %message, "rate limited, trying next provider");
                }
                ProviderOutcome::Failure { message, .. } => {
                    warn!(provider = provider.name(), %message, "provider failed");
                }
            }
        }
        None
    }
}
