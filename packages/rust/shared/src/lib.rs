//! Shared types, error model, and configuration for Quire.
//!
//! This crate is the foundation depended on by all other Quire crates.
//! It provides:
//! - [`QuireError`], the unified error type
//! - Domain types ([`Article`], [`Enrichment`], [`Topic`], [`Status`], [`Visibility`])
//! - Configuration ([`AppConfig`], provider credentials, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ContentConfig, EnrichSettings, ImportSettings,
    ProviderCredentials, ProviderKind, ProviderSettings, ReviewSettings, ensure_any_provider,
    init_config, is_usable_key, load_config, load_config_from, resolve_credentials,
    resolve_credentials_from_env, user_config_path,
};
pub use error::{QuireError, Result};
pub use types::{Article, Enrichment, Status, Topic, Visibility};
