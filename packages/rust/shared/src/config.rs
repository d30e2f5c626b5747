//! Application configuration for Quire.
//!
//! Project config lives at `./quire.toml` (or the user config dir).
//! CLI flags override config file values, which override defaults.
//! Provider credentials never live in the file: each provider names the
//! env var holding its key, and keys are resolved once into
//! [`ProviderCredentials`] before a run starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{QuireError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "quire.toml";

/// Config directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "quire";

/// Placeholder value shipped in `.env.local` templates.
const PLACEHOLDER_KEY: &str = "your_api_key_here";

const DEFAULT_REVIEW_PROMPT: &str = r#"You are a blunt, experienced editor reviewing a blog draft.

Point out the weakest paragraphs only: unclear claims, missing evidence,
filler, or ideas that contradict the WIP notes. Skip paragraphs that are fine.

Return ONLY valid JSON. No markdown. No explanation.

{
  "comments": [
    {
      "paragraph_start": "first 80+ characters of the paragraph, copied verbatim",
      "comment": "one or two sentences of concrete critique"
    }
  ]
}

RULES:
1. paragraph_start must be copied exactly from the draft, character for character
2. At most one comment per paragraph
3. If the draft needs no critique, return {"comments": []}

DRAFT:"#;

// ---------------------------------------------------------------------------
// Config structs (matching quire.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content store location.
    #[serde(default)]
    pub content: ContentConfig,

    /// Enrichment pipeline settings.
    #[serde(default)]
    pub enrich: EnrichSettings,

    /// Draft review settings.
    #[serde(default)]
    pub review: ReviewSettings,

    /// Brainstorm import settings.
    #[serde(default)]
    pub import: ImportSettings,

    /// Ordered provider chain. First entry is tried first.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content: ContentConfig::default(),
            enrich: EnrichSettings::default(),
            review: ReviewSettings::default(),
            import: ImportSettings::default(),
            providers: default_providers(),
        }
    }
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory holding the markdown articles.
    #[serde(default = "default_content_dir")]
    pub dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
        }
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

/// `[enrich]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichSettings {
    /// Body characters sent to the provider.
    #[serde(default = "default_enrich_max_len")]
    pub max_content_length: usize,

    /// Pause between successive items, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Total provider-chain attempts per item when the reply fails to parse.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause before a parse retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            max_content_length: default_enrich_max_len(),
            delay_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_enrich_max_len() -> usize {
    6000
}
fn default_delay_ms() -> u64 {
    12_000
}
fn default_max_attempts() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    2000
}

/// `[review]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Characters of title + notes + body sent to the provider.
    #[serde(default = "default_review_max_len")]
    pub max_content_length: usize,

    /// Pause between successive drafts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Total provider-chain attempts per draft when the reply fails to parse.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause before a parse retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Leading characters of a paragraph used as its matching key.
    #[serde(default = "default_paragraph_hash_length")]
    pub paragraph_hash_length: usize,

    /// Instruction text placed before the draft.
    #[serde(default = "default_review_prompt")]
    pub prompt: String,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            max_content_length: default_review_max_len(),
            delay_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            paragraph_hash_length: default_paragraph_hash_length(),
            prompt: default_review_prompt(),
        }
    }
}

fn default_review_max_len() -> usize {
    8000
}
fn default_paragraph_hash_length() -> usize {
    80
}
fn default_review_prompt() -> String {
    DEFAULT_REVIEW_PROMPT.into()
}

/// `[import]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Directory of raw brainstorm notes to import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
}

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Generative Language `generateContent` API.
    Gemini,
    /// OpenAI-compatible `chat/completions` API (Groq, OpenRouter, ...).
    Openai,
}

/// `[[providers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Display name used in logs and summaries.
    pub name: String,
    /// Wire protocol.
    pub kind: ProviderKind,
    /// Name of the env var holding the API key (never store the key itself).
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    2000
}

fn default_providers() -> Vec<ProviderSettings> {
    vec![
        ProviderSettings {
            name: "gemini".into(),
            kind: ProviderKind::Gemini,
            api_key_env: "GEMINI_API_KEY".into(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        },
        ProviderSettings {
            name: "groq".into(),
            kind: ProviderKind::Openai,
            api_key_env: "GROQ_API_KEY".into(),
            model: "llama-3.3-70b-versatile".into(),
            base_url: "https://api.groq.com/openai/v1".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        },
    ]
}

impl AppConfig {
    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.review.paragraph_hash_length == 0 {
            return Err(QuireError::config(
                "review.paragraph_hash_length must be greater than zero",
            ));
        }
        if self.enrich.max_attempts == 0 || self.review.max_attempts == 0 {
            return Err(QuireError::config("max_attempts must be at least 1"));
        }
        for provider in &self.providers {
            Url::parse(&provider.base_url).map_err(|e| {
                QuireError::config(format!(
                    "provider '{}' has invalid base_url '{}': {e}",
                    provider.name, provider.base_url
                ))
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credentials (resolved once, passed explicitly)
// ---------------------------------------------------------------------------

/// A provider's settings paired with the key resolved for it.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub settings: ProviderSettings,
    pub api_key: Option<String>,
}

impl ProviderCredentials {
    /// Whether this provider can be called at all.
    pub fn is_usable(&self) -> bool {
        is_usable_key(self.api_key.as_deref())
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.settings.name)
            .field("usable", &self.is_usable())
            .finish()
    }
}

/// A key is usable when present, non-blank, and not the template placeholder.
pub fn is_usable_key(key: Option<&str>) -> bool {
    match key.map(str::trim) {
        Some(k) => !k.is_empty() && k != PLACEHOLDER_KEY,
        None => false,
    }
}

/// Resolve every configured provider's key through `lookup`.
pub fn resolve_credentials<F>(config: &AppConfig, lookup: F) -> Vec<ProviderCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    config
        .providers
        .iter()
        .map(|settings| ProviderCredentials {
            settings: settings.clone(),
            api_key: lookup(&settings.api_key_env),
        })
        .collect()
}

/// Resolve provider keys from the process environment.
pub fn resolve_credentials_from_env(config: &AppConfig) -> Vec<ProviderCredentials> {
    resolve_credentials(config, |var| std::env::var(var).ok())
}

/// Fail unless at least one provider has a usable key.
pub fn ensure_any_provider(credentials: &[ProviderCredentials]) -> Result<()> {
    if credentials.iter().any(ProviderCredentials::is_usable) {
        return Ok(());
    }
    let vars: Vec<&str> = credentials
        .iter()
        .map(|c| c.settings.api_key_env.as_str())
        .collect();
    Err(QuireError::config(format!(
        "no provider credentials configured. Set at least one of: {} (e.g. in .env.local)",
        if vars.is_empty() {
            "<no providers listed in quire.toml>".to_string()
        } else {
            vars.join(", ")
        }
    )))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the user-level config file, if a config dir exists on this platform.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config: explicit path, then `./quire.toml`, then the user config
/// file, then defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(QuireError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return load_config_from(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    if let Some(user) = user_config_path().filter(|p| p.exists()) {
        return load_config_from(&user);
    }

    tracing::debug!("no config file found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| QuireError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        QuireError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Write a default config file to `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(QuireError::config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| QuireError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| QuireError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| QuireError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("paragraph_hash_length"));
    }

    #[test]
    fn config_roundtrip_keeps_provider_order() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        let names: Vec<&str> = parsed.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["gemini", "groq"]);
        assert_eq!(parsed.enrich.delay_ms, 12_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[content]
dir = "posts"

[review]
paragraph_hash_length = 40
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.content.dir, PathBuf::from("posts"));
        assert_eq!(config.review.paragraph_hash_length, 40);
        assert_eq!(config.enrich.max_content_length, 6000);
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn custom_provider_chain() {
        let toml_str = r#"
[[providers]]
name = "openrouter"
kind = "openai"
api_key_env = "OPENROUTER_API_KEY"
model = "moonshotai/kimi-k2"
base_url = "https://openrouter.ai/api/v1"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].kind, ProviderKind::Openai);
        assert_eq!(config.providers[0].max_tokens, 2000);
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.providers[0].base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_hash_length() {
        let mut config = AppConfig::default();
        config.review.paragraph_hash_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn usable_key_rules() {
        assert!(is_usable_key(Some("sk-123")));
        assert!(!is_usable_key(None));
        assert!(!is_usable_key(Some("")));
        assert!(!is_usable_key(Some("   ")));
        assert!(!is_usable_key(Some("your_api_key_here")));
    }

    #[test]
    fn resolve_uses_lookup_not_process_env() {
        let config = AppConfig::default();
        let creds = resolve_credentials(&config, |var| {
            (var == "GROQ_API_KEY").then(|| "gsk-test".to_string())
        });
        assert_eq!(creds.len(), 2);
        assert!(!creds[0].is_usable());
        assert!(creds[1].is_usable());
        assert!(ensure_any_provider(&creds).is_ok());
    }

    #[test]
    fn no_credentials_is_config_error() {
        let config = AppConfig::default();
        let creds = resolve_credentials(&config, |_| None);
        let err = ensure_any_provider(&creds).unwrap_err();
        assert!(matches!(err, QuireError::Config { .. }));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn debug_output_hides_key() {
        let config = AppConfig::default();
        let creds = resolve_credentials(&config, |_| Some("super-secret".into()));
        let dbg = format!("{:?}", creds[0]);
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn explicit_missing_config_fails() {
        let result = load_config(Some(Path::new("/definitely/not/here/quire.toml")));
        assert!(matches!(result, Err(QuireError::Config { .. })));
    }
}
