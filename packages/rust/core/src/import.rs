//! Brainstorm import.
//!
//! Copies markdown notes from an external directory into the content store
//! as hidden articles, normalizing their frontmatter on the way in.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::{error, info, instrument, warn};

use quire_content::{ContentStore, Document};
use quire_shared::{QuireError, Result};

static DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-?").expect("valid regex"));

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_SOURCE: &str = "brainstorm-with-ai";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub source_dir: PathBuf,
    /// Single file name inside `source_dir`.
    pub file: Option<String>,
    pub dry_run: bool,
    /// Overwrite articles that already exist in the store.
    pub force: bool,
    /// Fallback date for notes with none in frontmatter or file name.
    pub today: NaiveDate,
}

impl ImportOptions {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            file: None,
            dry_run: false,
            force: false,
            today: Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub dry_run: bool,
}

enum FileOutcome {
    Imported,
    Updated,
    Skipped,
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

/// `2025-01-26-how-ideas-happen.md` → `how-ideas-happen`.
pub fn normalize_slug(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    match DATE_PREFIX_RE.find(stem) {
        Some(m) if m.end() < stem.len() && m.as_str().ends_with('-') => stem[m.end()..].to_string(),
        _ => stem.to_string(),
    }
}

/// Leading `YYYY-MM-DD` of a file name, if any.
pub fn date_from_filename(file_name: &str) -> Option<String> {
    DATE_PREFIX_RE
        .captures(file_name)
        .map(|caps| caps[1].to_string())
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn keep_or(data: &Mapping, key: &str, fallback: Value) -> Value {
    match data.get(key) {
        Some(v) if is_present(Some(v)) => v.clone(),
        _ => fallback,
    }
}

/// Rebuild frontmatter in the store's shape. Existing values win over
/// defaults, except `visibility`, which is always `hidden`.
pub fn normalize_frontmatter(data: &Mapping, file_name: &str, today: NaiveDate) -> Mapping {
    let fallback_date = date_from_filename(file_name)
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());

    let mut out = Mapping::new();
    let mut put = |key: &str, value: Value| {
        out.insert(Value::String(key.into()), value);
    };
    put("title", keep_or(data, "title", DEFAULT_TITLE.into()));
    put("date", keep_or(data, "date", fallback_date.into()));
    put("status", keep_or(data, "status", "published".into()));
    put("visibility", "hidden".into());
    put("tags", keep_or(data, "tags", Value::Sequence(Vec::new())));
    put("source", keep_or(data, "source", DEFAULT_SOURCE.into()));
    if is_present(data.get("wip_notes")) {
        put("wip_notes", keep_or(data, "wip_notes", Value::Null));
    }
    out
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(source = %options.source_dir.display(), dry_run = options.dry_run))]
pub fn run_import(store: &ContentStore, options: &ImportOptions) -> Result<ImportSummary> {
    if !options.source_dir.is_dir() {
        return Err(QuireError::config(format!(
            "brainstorm source directory not found: {}",
            options.source_dir.display()
        )));
    }

    let files = match &options.file {
        Some(name) => {
            let path = options.source_dir.join(name);
            if !path.is_file() {
                return Err(QuireError::NotFound(path.display().to_string()));
            }
            vec![path]
        }
        None => list_markdown(&options.source_dir)?,
    };

    let mut summary = ImportSummary {
        dry_run: options.dry_run,
        ..Default::default()
    };
    if files.is_empty() {
        info!("no markdown files in source directory");
        return Ok(summary);
    }

    if !options.dry_run && !store.exists() {
        std::fs::create_dir_all(store.root()).map_err(|e| QuireError::io(store.root(), e))?;
    }

    info!(files = files.len(), "importing brainstorms");
    for path in &files {
        match import_file(store, options, path) {
            Ok(FileOutcome::Imported) => summary.imported += 1,
            Ok(FileOutcome::Updated) => summary.updated += 1,
            Ok(FileOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                error!(path = %path.display(), error = %e, "import failed");
                summary.errors += 1;
            }
        }
    }

    info!(
        imported = summary.imported,
        updated = summary.updated,
        skipped = summary.skipped,
        errors = summary.errors,
        "import complete"
    );
    Ok(summary)
}

fn list_markdown(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| QuireError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    Ok(files)
}

fn import_file(store: &ContentStore, options: &ImportOptions, path: &Path) -> Result<FileOutcome> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if file_name.eq_ignore_ascii_case("readme.md") || !file_name.ends_with(".md") {
        info!(file = %file_name, "not a content file, skipping");
        return Ok(FileOutcome::Skipped);
    }

    let slug = normalize_slug(&file_name);
    let dest = store.root().join(format!("{slug}.md"));

    let raw = std::fs::read_to_string(path).map_err(|e| QuireError::io(path, e))?;
    let source = Document::parse(&raw, path)?;
    let document = Document::new(
        normalize_frontmatter(&source.data, &file_name, options.today),
        source.body,
    );
    let rendered = document.render()?;

    let exists = dest.exists();
    if exists && !options.force {
        warn!(%slug, "already exists, use --force to overwrite");
        return Ok(FileOutcome::Skipped);
    }

    let outcome = if exists {
        FileOutcome::Updated
    } else {
        FileOutcome::Imported
    };

    if options.dry_run {
        info!(%slug, update = exists, "[dry run] would import");
        return Ok(outcome);
    }

    store.write(&dest, &rendered)?;
    info!(%slug, update = exists, "imported");
    Ok(outcome)
}
