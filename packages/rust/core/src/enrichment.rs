//! Enrichment orchestrator.
//!
//! Walks the content store once, asks the provider chain for metadata on
//! every article without an `enriched_at` marker, and merges the normalized
//! result into frontmatter. A file is rewritten only once a fully validated
//! result is in hand, so an interrupted run leaves nothing half-merged and
//! can simply be started again.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde_yaml::Value;
use tracing::{error, info, instrument, warn};

use quire_content::{ContentStore, Document, StoredArticle};
use quire_providers::ProviderChain;
use quire_shared::{EnrichSettings, Enrichment, Result};

use crate::batch::{pace, select_items};
use crate::progress::RunProgress;
use crate::prompt::enrichment_prompt;
use crate::response::parse_enrichment;

// ---------------------------------------------------------------------------
// Options & summary
// ---------------------------------------------------------------------------

/// Runtime options, merged from `[enrich]` config and CLI flags.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Body characters sent to the provider.
    pub max_content_length: usize,
    /// Pause between successive items.
    pub delay: Duration,
    /// Provider-chain attempts per item when the reply fails to parse.
    pub max_attempts: u32,
    /// Fixed pause before a parse retry.
    pub retry_delay: Duration,
    /// Call providers and log results, but write nothing.
    pub dry_run: bool,
    /// Re-enrich items that already carry the marker.
    pub force: bool,
    /// Single item (slug, file name, or path) instead of the whole store.
    pub target: Option<String>,
    /// Date stamped into `enriched_at`.
    pub today: NaiveDate,
}

impl EnrichOptions {
    pub fn from_settings(settings: &EnrichSettings) -> Self {
        Self {
            max_content_length: settings.max_content_length,
            delay: Duration::from_millis(settings.delay_ms),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            dry_run: false,
            force: false,
            target: None,
            today: Utc::now().date_naive(),
        }
    }
}

/// End-of-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Articles found.
    pub total: usize,
    pub enriched: usize,
    pub failed: usize,
    /// Already carried the marker. Unreadable files count as failed.
    pub skipped: usize,
    /// Successful enrichments per provider name.
    pub by_provider: BTreeMap<String, usize>,
    pub dry_run: bool,
}

enum ItemOutcome {
    Enriched { provider: String },
    Failed,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run the enrichment pass over the store.
///
/// Only configuration-level problems (an unknown target) return `Err`;
/// per-item failures are counted in the summary and the walk continues.
#[instrument(skip_all, fields(root = %store.root().display(), dry_run = options.dry_run))]
pub async fn run_enrichment(
    store: &ContentStore,
    chain: &ProviderChain,
    options: &EnrichOptions,
    progress: &dyn RunProgress,
) -> Result<EnrichSummary> {
    let mut summary = EnrichSummary {
        dry_run: options.dry_run,
        ..Default::default()
    };

    progress.phase("Scanning content");
    let files = select_items(store, options.target.as_deref())?;
    summary.total = files.len();

    let mut pending: Vec<StoredArticle> = Vec::new();
    for path in &files {
        match store.load(path) {
            Ok(item) if item.article.is_enriched() && !options.force => summary.skipped += 1,
            Ok(item) => pending.push(item),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read article");
                summary.failed += 1;
            }
        }
    }

    info!(
        total = summary.total,
        pending = pending.len(),
        skipped = summary.skipped,
        "enrichment scan complete"
    );

    progress.phase("Enriching articles");
    let count = pending.len();
    for (i, item) in pending.into_iter().enumerate() {
        progress.item(i + 1, count, &item.article.slug);

        match enrich_item(store, chain, options, item).await {
            ItemOutcome::Enriched { provider } => {
                summary.enriched += 1;
                *summary.by_provider.entry(provider).or_default() += 1;
            }
            ItemOutcome::Failed => summary.failed += 1,
        }

        pace(i, count, options.delay).await;
    }

    progress.finish();
    info!(
        enriched = summary.enriched,
        failed = summary.failed,
        skipped = summary.skipped,
        "enrichment complete"
    );
    Ok(summary)
}

#[instrument(skip_all, fields(slug = %item.article.slug))]
async fn enrich_item(
    store: &ContentStore,
    chain: &ProviderChain,
    options: &EnrichOptions,
    item: StoredArticle,
) -> ItemOutcome {
    let prompt = enrichment_prompt(&item.article.body, options.max_content_length);

    let mut attempt = 0;
    let (enrichment, provider) = loop {
        attempt += 1;

        let Some(reply) = chain.call_with_fallback(&prompt).await else {
            error!("all providers failed");
            return ItemOutcome::Failed;
        };

        match parse_enrichment(&reply.text) {
            Ok(enrichment) => break (enrichment, reply.provider),
            Err(e) if attempt < options.max_attempts => {
                warn!(attempt, max = options.max_attempts, error = %e, "unparseable reply, retrying");
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(e) => {
                error!(attempt, error = %e, "giving up on unparseable reply");
                return ItemOutcome::Failed;
            }
        }
    };

    if options.dry_run {
        info!(
            %provider,
            topic = %enrichment.topic,
            summary = %enrichment.summary,
            "[dry run] would enrich"
        );
        return ItemOutcome::Enriched { provider };
    }

    let enriched_at = options.today.format("%Y-%m-%d").to_string();
    match persist(store, &item.path, item.document, &enrichment, &enriched_at) {
        Ok(()) => {
            info!(%provider, "enriched");
            ItemOutcome::Enriched { provider }
        }
        Err(e) => {
            error!(error = %e, "failed to write enriched article");
            ItemOutcome::Failed
        }
    }
}

fn persist(
    store: &ContentStore,
    path: &Path,
    mut document: Document,
    enrichment: &Enrichment,
    enriched_at: &str,
) -> Result<()> {
    merge_enrichment(&mut document, enrichment, enriched_at);
    let rendered = document.render()?;
    store.write(path, &rendered)
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().cloned().map(Value::String).collect())
}

/// Overwrite every enrichment field plus the marker in `document`.
pub fn merge_enrichment(document: &mut Document, enrichment: &Enrichment, enriched_at: &str) {
    document.set("summary", Value::String(enrichment.summary.clone()));
    document.set("highlights", string_seq(&enrichment.highlights));
    document.set("topic", Value::String(enrichment.topic.as_str().into()));
    document.set(
        "secondary_topic",
        enrichment
            .secondary_topic
            .map_or(Value::Null, |t| Value::String(t.as_str().into())),
    );
    document.set("related_concepts", string_seq(&enrichment.related_concepts));
    document.set("scope", Value::String(enrichment.scope.clone()));
    document.set("anti_pattern", Value::String(enrichment.anti_pattern.clone()));
    document.set("enriched_at", Value::String(enriched_at.into()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use crate::test_support::{ScriptedProvider, VALID_ENRICHMENT, chain_of, write_article};
    use quire_providers::ProviderOutcome;
    use quire_shared::Topic;

    fn options() -> EnrichOptions {
        EnrichOptions {
            max_content_length: 6000,
            delay: Duration::ZERO,
            max_attempts: 2,
            retry_delay: Duration::ZERO,
            dry_run: false,
            force: false,
            target: None,
            today: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        }
    }

    fn ok(text: &str) -> ProviderOutcome {
        ProviderOutcome::Success(text.into())
    }

    #[tokio::test]
    async fn enriches_unmarked_article() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_article(dir.path(), "habits", "---\ntitle: Habits\ncustom: keep\n---\nBody text.\n");
        let store = ContentStore::new(dir.path());
        let (provider, calls) = ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.by_provider.get("gemini"), Some(&1));
        assert_eq!(calls.count(), 1);

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.article.enriched_at.as_deref(), Some("2025-03-14"));
        assert_eq!(loaded.document.get_str("custom").as_deref(), Some("keep"));
        let e = loaded.article.enrichment.expect("full enrichment block");
        assert_eq!(e.topic, Topic::Learning);
        assert_eq!(e.highlights.len(), 3);
        assert_eq!(loaded.article.body, "Body text.\n");
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_article(dir.path(), "a", "---\ntitle: A\n---\nBody.\n");
        write_article(dir.path(), "b", "---\ntitle: B\n---\nBody.\n");
        let store = ContentStore::new(dir.path());

        let (provider, calls) =
            ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT), ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let first = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(first.enriched, 2);
        let after_first = std::fs::read_to_string(&path).unwrap();

        let second = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(second.enriched, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(calls.count(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), after_first);
    }

    #[tokio::test]
    async fn rate_limited_provider_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_article(dir.path(), "a", "---\ntitle: A\n---\nBody.\n");
        let store = ContentStore::new(dir.path());

        let (gemini, _) = ScriptedProvider::new(
            "gemini",
            vec![ProviderOutcome::Failure {
                message: "429".into(),
                rate_limited: true,
            }],
        );
        let (groq, _) = ScriptedProvider::new("groq", vec![ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![gemini, groq]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.by_provider.get("groq"), Some(&1));
        assert!(!summary.by_provider.contains_key("gemini"));
    }

    #[tokio::test]
    async fn parse_error_is_retried_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_article(dir.path(), "a", "---\ntitle: A\n---\nBody.\n");
        let store = ContentStore::new(dir.path());
        let (provider, calls) =
            ScriptedProvider::new("gemini", vec![ok("not json at all"), ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(calls.count(), 2);
        assert!(store.load(&path).unwrap().article.is_enriched());
    }

    #[tokio::test]
    async fn exhausted_parse_retries_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = "---\ntitle: A\n---\nBody.\n";
        let path = write_article(dir.path(), "a", original);
        let store = ContentStore::new(dir.path());
        let (provider, calls) = ScriptedProvider::new("gemini", vec![ok("nope"), ok("still nope")]);
        let chain = chain_of(vec![provider]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(calls.count(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn total_provider_failure_fails_item_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_article(dir.path(), "a", "---\ntitle: A\n---\nBody.\n");
        let b = write_article(dir.path(), "b", "---\ntitle: B\n---\nBody.\n");
        let store = ContentStore::new(dir.path());
        let (provider, _) = ScriptedProvider::new(
            "gemini",
            vec![
                ProviderOutcome::Failure {
                    message: "500".into(),
                    rate_limited: false,
                },
                ok(VALID_ENRICHMENT),
            ],
        );
        let chain = chain_of(vec![provider]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.enriched, 1);
        assert!(!store.load(&a).unwrap().article.is_enriched());
        assert!(store.load(&b).unwrap().article.is_enriched());
    }

    #[tokio::test]
    async fn write_failure_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let original = "---\ntitle: A\n---\nBody.\n";
        let a = write_article(dir.path(), "a", original);
        let b = write_article(dir.path(), "b", "---\ntitle: B\n---\nBody.\n");
        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir(dir.path().join("a.md.tmp")).unwrap();
        let store = ContentStore::new(dir.path());
        let (provider, calls) =
            ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT), ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let summary = run_enrichment(&store, &chain, &options(), &SilentProgress).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.enriched, 1);
        assert_eq!(calls.count(), 2);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), original);
        assert!(store.load(&b).unwrap().article.is_enriched());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let original = "---\ntitle: A\n---\nBody.\n";
        let path = write_article(dir.path(), "a", original);
        let store = ContentStore::new(dir.path());
        let (provider, _) = ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let opts = EnrichOptions {
            dry_run: true,
            ..options()
        };
        let summary = run_enrichment(&store, &chain, &opts, &SilentProgress).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.enriched, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn force_re_enriches_marked_article() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_article(
            dir.path(),
            "a",
            "---\ntitle: A\nsummary: old\nenriched_at: 2024-01-01\n---\nBody.\n",
        );
        let store = ContentStore::new(dir.path());
        let (provider, calls) = ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let opts = EnrichOptions {
            force: true,
            ..options()
        };
        let summary = run_enrichment(&store, &chain, &opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(calls.count(), 1);
        let article = store.load(&path).unwrap().article;
        assert_eq!(article.enriched_at.as_deref(), Some("2025-03-14"));
        assert_ne!(article.enrichment.unwrap().summary, "old");
    }

    #[tokio::test]
    async fn single_target_only_touches_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_article(dir.path(), "a", "---\ntitle: A\n---\nBody.\n");
        let b = write_article(dir.path(), "b", "---\ntitle: B\n---\nBody.\n");
        let store = ContentStore::new(dir.path());
        let (provider, _) = ScriptedProvider::new("gemini", vec![ok(VALID_ENRICHMENT)]);
        let chain = chain_of(vec![provider]);

        let opts = EnrichOptions {
            target: Some("b".into()),
            ..options()
        };
        let summary = run_enrichment(&store, &chain, &opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.total, 1);
        assert!(!store.load(&a).unwrap().article.is_enriched());
        assert!(store.load(&b).unwrap().article.is_enriched());
    }

    #[tokio::test]
    async fn unknown_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let chain = chain_of(vec![]);
        let opts = EnrichOptions {
            target: Some("ghost".into()),
            ..options()
        };
        assert!(run_enrichment(&store, &chain, &opts, &SilentProgress).await.is_err());
    }

    #[test]
    fn merge_sets_every_field() {
        let mut doc = Document::parse("---\ntitle: T\n---\n", Path::new("t.md")).unwrap();
        let enrichment = Enrichment {
            summary: "S".into(),
            highlights: vec!["a".into(), "b".into(), "c".into()],
            topic: Topic::Psychology,
            secondary_topic: None,
            related_concepts: vec!["x".into(), "y".into()],
            scope: "sc".into(),
            anti_pattern: "ap".into(),
        };
        merge_enrichment(&mut doc, &enrichment, "2025-01-01");
        for key in [
            "summary",
            "highlights",
            "topic",
            "secondary_topic",
            "related_concepts",
            "scope",
            "anti_pattern",
            "enriched_at",
        ] {
            assert!(doc.contains(key), "missing {key}");
        }
        assert_eq!(doc.data.get("secondary_topic"), Some(&Value::Null));
    }
}
