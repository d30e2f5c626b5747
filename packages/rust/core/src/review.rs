//! Review orchestrator.
//!
//! Sends draft articles to the provider chain for a paragraph-level
//! critique and writes each comment back as an HTML marker after the
//! paragraph it refers to. Frontmatter text is carried through untouched.

use std::time::Duration;

use tracing::{error, info, instrument, warn};

use quire_content::{
    ContentStore, ReviewComment, StoredArticle, apply_insertions, extract_paragraphs, plan_comments,
};
use quire_providers::ProviderChain;
use quire_shared::{Result, ReviewSettings};

use crate::batch::{pace, select_items};
use crate::progress::RunProgress;
use crate::prompt::{review_input, review_prompt};
use crate::response::parse_review;

// ---------------------------------------------------------------------------
// Options & summary
// ---------------------------------------------------------------------------

/// Which items a review run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewTarget {
    /// One item by slug, file name, or path.
    File(String),
    /// Every draft in the store.
    AllDrafts,
}

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub target: ReviewTarget,
    pub max_content_length: usize,
    pub delay: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Characters of a paragraph used as its matching key.
    pub key_len: usize,
    /// Instructions placed ahead of the article content.
    pub prompt: String,
    /// Hand every prompt to [`RunProgress::prompt`] before sending.
    pub show_prompt: bool,
    /// Ignore existing comment markers.
    pub force: bool,
    pub dry_run: bool,
}

impl ReviewOptions {
    pub fn from_settings(settings: &ReviewSettings, target: ReviewTarget) -> Self {
        Self {
            target,
            max_content_length: settings.max_content_length,
            delay: Duration::from_millis(settings.delay_ms),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            key_len: settings.paragraph_hash_length,
            prompt: settings.prompt.clone(),
            show_prompt: false,
            force: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Drafts that got a usable critique (possibly with zero comments).
    pub reviewed: usize,
    /// Markers inserted (or that would be, on a dry run).
    pub comments_added: usize,
    /// Non-draft items.
    pub skipped: usize,
    pub failed: usize,
    /// Comments whose paragraph could not be found.
    pub unmatched: usize,
    /// Comments dropped because the paragraph already had a marker.
    pub already_commented: usize,
    pub dry_run: bool,
}

enum ItemOutcome {
    Reviewed {
        added: usize,
        unmatched: usize,
        already_commented: usize,
    },
    Failed,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(root = %store.root().display(), dry_run = options.dry_run))]
pub async fn run_review(
    store: &ContentStore,
    chain: &ProviderChain,
    options: &ReviewOptions,
    progress: &dyn RunProgress,
) -> Result<ReviewSummary> {
    let mut summary = ReviewSummary {
        dry_run: options.dry_run,
        ..Default::default()
    };

    progress.phase("Scanning drafts");
    let target = match &options.target {
        ReviewTarget::File(t) => Some(t.as_str()),
        ReviewTarget::AllDrafts => None,
    };
    let files = select_items(store, target)?;

    let mut drafts: Vec<StoredArticle> = Vec::new();
    for path in &files {
        match store.load(path) {
            Ok(item) if item.article.is_draft() => drafts.push(item),
            Ok(item) => {
                info!(slug = %item.article.slug, "not a draft, skipping");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read article");
                summary.failed += 1;
            }
        }
    }

    info!(drafts = drafts.len(), skipped = summary.skipped, "review scan complete");

    progress.phase("Reviewing drafts");
    let count = drafts.len();
    for (i, item) in drafts.into_iter().enumerate() {
        progress.item(i + 1, count, &item.article.slug);

        match review_item(store, chain, options, progress, item).await {
            ItemOutcome::Reviewed {
                added,
                unmatched,
                already_commented,
            } => {
                summary.reviewed += 1;
                summary.comments_added += added;
                summary.unmatched += unmatched;
                summary.already_commented += already_commented;
            }
            ItemOutcome::Failed => summary.failed += 1,
        }

        pace(i, count, options.delay).await;
    }

    progress.finish();
    info!(
        reviewed = summary.reviewed,
        comments = summary.comments_added,
        failed = summary.failed,
        "review complete"
    );
    Ok(summary)
}

#[instrument(skip_all, fields(slug = %item.article.slug))]
async fn review_item(
    store: &ContentStore,
    chain: &ProviderChain,
    options: &ReviewOptions,
    progress: &dyn RunProgress,
    item: StoredArticle,
) -> ItemOutcome {
    let input = review_input(&item.article, options.max_content_length);
    let prompt = review_prompt(&options.prompt, &input);
    if options.show_prompt {
        progress.prompt(&item.article.slug, &prompt);
    }

    let Some(comments) = request_comments(chain, options, &prompt).await else {
        return ItemOutcome::Failed;
    };

    if comments.is_empty() {
        info!("no critique needed");
        return ItemOutcome::Reviewed {
            added: 0,
            unmatched: 0,
            already_commented: 0,
        };
    }

    let body = &item.article.body;
    let paragraphs = extract_paragraphs(body, options.key_len);
    let plan = plan_comments(body, &paragraphs, &comments, options.key_len, options.force);
    let added = plan.insertions.len();

    if options.dry_run {
        for insertion in &plan.insertions {
            info!(
                line = insertion.line_index,
                paragraph = %insertion.paragraph_preview,
                comment = %insertion.comment,
                "[dry run] would insert comment"
            );
        }
    } else if added > 0 {
        let updated = apply_insertions(body, &plan.insertions);
        let written = item
            .document
            .render_with_body(&updated)
            .and_then(|rendered| store.write(&item.path, &rendered));
        if let Err(e) = written {
            error!(error = %e, "failed to write reviewed article");
            return ItemOutcome::Failed;
        }
        info!(comments = added, "comments inserted");
    }

    ItemOutcome::Reviewed {
        added,
        unmatched: plan.unmatched.len(),
        already_commented: plan.already_commented.len(),
    }
}

/// Call the chain until a reply parses, within the attempt budget.
async fn request_comments(
    chain: &ProviderChain,
    options: &ReviewOptions,
    prompt: &str,
) -> Option<Vec<ReviewComment>> {
    for attempt in 1..=options.max_attempts {
        let Some(reply) = chain.call_with_fallback(prompt).await else {
            error!("all providers failed");
            return None;
        };

        match parse_review(&reply.text) {
            Ok(comments) => {
                info!(provider = %reply.provider, comments = comments.len(), "critique received");
                return Some(comments);
            }
            Err(e) if attempt < options.max_attempts => {
                warn!(attempt, max = options.max_attempts, error = %e, "unparseable reply, retrying");
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(e) => error!(attempt, error = %e, "giving up on unparseable reply"),
        }
    }
    None
}
