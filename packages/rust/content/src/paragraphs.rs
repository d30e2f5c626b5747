//! Paragraph extraction, matching keys, and inline comment injection.
//!
//! A paragraph is a run of non-blank lines. Its key is a hash of the first
//! N characters of its whitespace-normalized text, so re-wrapping a
//! paragraph does not change its key as long as those characters survive.
//! Keys are recomputed on every run and never persisted.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Leading token of an injected review comment. Also the duplicate signal.
pub const COMMENT_MARKER: &str = "<!-- COMMENT:";

/// Lines after a paragraph's last line scanned for an existing marker.
const DUPLICATE_WINDOW: usize = 2;

/// Characters of a paragraph echoed into log lines.
const PREVIEW_CHARS: usize = 50;

/// One paragraph of an article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Lines joined with single spaces.
    pub text: String,
    /// Matching key (see [`paragraph_key`]).
    pub key: String,
    /// Zero-based index of the paragraph's first line in the body.
    pub line_start: usize,
}

/// A critique returned by the review provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewComment {
    /// Opening text of the paragraph being critiqued.
    #[serde(default)]
    pub paragraph_start: String,
    #[serde(default)]
    pub comment: String,
}

/// A comment scheduled for insertion before line `line_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub line_index: usize,
    pub comment: String,
    /// Preview of the target paragraph, for logs.
    pub paragraph_preview: String,
}

/// Outcome of matching comments against a body.
#[derive(Debug, Clone, Default)]
pub struct CommentPlan {
    /// Insertions in descending `line_index` order.
    pub insertions: Vec<Insertion>,
    /// Comments whose `paragraph_start` matched no paragraph.
    pub unmatched: Vec<ReviewComment>,
    /// Paragraph previews skipped because a marker was already there.
    pub already_commented: Vec<String>,
}

/// Collapse internal whitespace runs to single spaces and trim.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Hash of the first `key_len` characters of the normalized text.
pub fn paragraph_key(text: &str, key_len: usize) -> String {
    let normalized = normalize(text);
    let mut hasher = Sha256::new();
    hasher.update(prefix_chars(&normalized, key_len).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split a body into paragraphs on blank-line boundaries.
pub fn extract_paragraphs(body: &str, key_len: usize) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut line_start = 0;

    for (i, line) in body.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut paragraphs, &mut current, line_start, key_len);
            continue;
        }
        if current.is_empty() {
            line_start = i;
        }
        current.push(trimmed);
    }
    flush_paragraph(&mut paragraphs, &mut current, line_start, key_len);

    paragraphs
}

fn flush_paragraph(
    paragraphs: &mut Vec<Paragraph>,
    current: &mut Vec<&str>,
    line_start: usize,
    key_len: usize,
) {
    if current.is_empty() {
        return;
    }
    let text = current.join(" ");
    paragraphs.push(Paragraph {
        key: paragraph_key(&text, key_len),
        text,
        line_start,
    });
    current.clear();
}

/// Index of the last line of the paragraph starting at `start`.
fn paragraph_end(lines: &[&str], start: usize) -> usize {
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            break;
        }
        end = i;
    }
    end
}

/// Whether a marker already sits in the few lines after `end`.
///
/// Heuristic: a marker pushed further down by extra blank lines is missed.
fn has_existing_comment(lines: &[&str], end: usize) -> bool {
    lines
        .iter()
        .skip(end + 1)
        .take(DUPLICATE_WINDOW)
        .any(|line| line.trim_start().starts_with(COMMENT_MARKER))
}

fn preview(text: &str) -> String {
    prefix_chars(text, PREVIEW_CHARS).to_string()
}

/// Match comments to paragraphs and compute insertion points against the
/// body's original line numbering.
pub fn plan_comments(
    body: &str,
    paragraphs: &[Paragraph],
    comments: &[ReviewComment],
    key_len: usize,
    force: bool,
) -> CommentPlan {
    let lines: Vec<&str> = body.split('\n').collect();
    let mut plan = CommentPlan::default();

    for comment in comments {
        let key = paragraph_key(&comment.paragraph_start, key_len);
        let Some(paragraph) = paragraphs.iter().find(|p| p.key == key) else {
            info!(
                paragraph = %preview(&comment.paragraph_start),
                "could not find paragraph for comment"
            );
            plan.unmatched.push(comment.clone());
            continue;
        };

        let end = paragraph_end(&lines, paragraph.line_start);
        if !force && has_existing_comment(&lines, end) {
            info!(
                paragraph = %preview(&paragraph.text),
                "skipping paragraph, already has a comment"
            );
            plan.already_commented.push(preview(&paragraph.text));
            continue;
        }

        debug!(line = end + 1, paragraph = %preview(&paragraph.text), "comment matched");
        plan.insertions.push(Insertion {
            line_index: end + 1,
            comment: comment.comment.trim().to_string(),
            paragraph_preview: preview(&paragraph.text),
        });
    }

    // Later positions first, so earlier insertions never shift them.
    plan.insertions.sort_by(|a, b| b.line_index.cmp(&a.line_index));
    plan
}

/// Format a comment as a blank separator plus a single marker line.
fn marker_lines(comment: &str) -> [String; 2] {
    let single_line = normalize(comment);
    [String::new(), format!("{COMMENT_MARKER} {single_line} -->")]
}

/// Apply planned insertions. Expects descending `line_index` order, as
/// produced by [`plan_comments`].
pub fn apply_insertions(body: &str, insertions: &[Insertion]) -> String {
    let mut lines: Vec<String> = body.split('\n').map(String::from).collect();
    for insertion in insertions {
        let at = insertion.line_index.min(lines.len());
        let [blank, marker] = marker_lines(&insertion.comment);
        lines.splice(at..at, [blank, marker]);
    }
    lines.join("\n")
}
