//! Shared HTTP plumbing for provider clients.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use quire_shared::{QuireError, Result};

use crate::ProviderOutcome;

/// Default timeout in seconds for a single generation request.
const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Longest error body echoed back into a failure message.
const MAX_ERROR_BODY: usize = 300;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("Quire/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with appropriate settings.
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| QuireError::Provider(format!("failed to build HTTP client: {e}")))
}

/// Whether a provider error message reads like quota or rate limiting.
pub(crate) fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["429", "quota", "rate limit", "rate-limit", "ratelimit", "resource_exhausted"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Map a non-success HTTP response to a failure outcome.
pub(crate) fn failure_from_status(status: StatusCode, body: &str) -> ProviderOutcome {
    let rate_limited =
        status == StatusCode::TOO_MANY_REQUESTS || is_rate_limit_message(body);
    let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
    ProviderOutcome::Failure {
        message: format!("{}: {}", status.as_u16(), snippet.trim()),
        rate_limited,
    }
}

/// Map a transport-level reqwest error to a failure outcome.
pub(crate) fn failure_from_transport(err: &reqwest::Error) -> ProviderOutcome {
    let message = err.to_string();
    ProviderOutcome::Failure {
        rate_limited: is_rate_limit_message(&message),
        message,
    }
}
