//! The content store: a flat directory of markdown articles.
//!
//! The store is the single source of truth. Every read goes to disk and every
//! write replaces a whole file via a sibling temp file and a rename.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use quire_shared::{Article, Enrichment, QuireError, Result, Status, Topic, Visibility};

use crate::frontmatter::Document;

/// A markdown file loaded from the store.
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub path: PathBuf,
    pub document: Document,
    pub article: Article,
}

/// Handle to a content directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Article files, sorted by name. Templates (`_*.md`) are excluded.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| QuireError::io(&self.root, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| QuireError::io(&self.root, e))?;
            let path = entry.path();
            if is_article_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        debug!(root = %self.root.display(), count = files.len(), "listed content store");
        Ok(files)
    }

    /// Resolve a slug, file name, or path to an article file in this store.
    pub fn resolve(&self, target: &str) -> Result<PathBuf> {
        let as_path = PathBuf::from(target);
        let mut candidates = vec![self.root.join(target)];
        if as_path.extension().is_none() {
            candidates.push(self.root.join(format!("{target}.md")));
        }
        if as_path.starts_with(&self.root) {
            candidates.insert(0, as_path);
        }

        let found = candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| {
                QuireError::NotFound(format!("{target} (looked in {})", self.root.display()))
            })?;

        // Absolute paths and `..` segments must still land inside the store.
        let inside = match (found.canonicalize(), self.root.canonicalize()) {
            (Ok(file), Ok(root)) => file.starts_with(root),
            _ => false,
        };
        if !inside {
            return Err(QuireError::NotFound(format!(
                "{target} (outside {})",
                self.root.display()
            )));
        }
        Ok(found)
    }

    /// Read and parse one article.
    pub fn load(&self, path: &Path) -> Result<StoredArticle> {
        let raw = std::fs::read_to_string(path).map_err(|e| QuireError::io(path, e))?;
        let document = Document::parse(&raw, path)?;
        let article = article_from_document(&slug_for(path), &document);
        Ok(StoredArticle {
            path: path.to_path_buf(),
            document,
            article,
        })
    }

    /// Replace `path` with `contents` in one rename.
    pub fn write(&self, path: &Path, contents: &str) -> Result<()> {
        write_atomic(path, contents)
    }
}

/// Whole-file write through a sibling temp file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(|e| QuireError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(QuireError::io(path, e));
    }
    Ok(())
}

fn is_article_file(path: &Path) -> bool {
    let is_md = path.extension().is_some_and(|ext| ext == "md");
    let is_template = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'));
    path.is_file() && is_md && !is_template
}

/// Slug = file stem.
pub fn slug_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Build the typed view of a parsed document.
pub fn article_from_document(slug: &str, doc: &Document) -> Article {
    Article {
        slug: slug.to_string(),
        title: doc.get_str("title").unwrap_or_else(|| "Untitled".into()),
        date: doc.get_str("date"),
        tags: doc.get_string_list("tags").unwrap_or_default(),
        status: Status::from_frontmatter(doc.get_str("status").as_deref()),
        visibility: Visibility::from_frontmatter(doc.get_str("visibility").as_deref()),
        wip_notes: doc.get_str("wip_notes"),
        body: doc.body.clone(),
        enrichment: enrichment_from_document(doc),
        enriched_at: doc.get_str("enriched_at"),
    }
}

/// The enrichment block, only when every field is present.
fn enrichment_from_document(doc: &Document) -> Option<Enrichment> {
    let secondary_topic = match doc.data.get("secondary_topic")? {
        Value::Null => None,
        Value::String(s) => Some(Topic::parse(s)?),
        _ => return None,
    };
    Some(Enrichment {
        summary: doc.get_str("summary")?,
        highlights: doc.get_string_list("highlights")?,
        topic: Topic::parse(&doc.get_str("topic")?)?,
        secondary_topic,
        related_concepts: doc.get_string_list("related_concepts")?,
        scope: doc.get_str("scope")?,
        anti_pattern: doc.get_str("anti_pattern")?,
    })
}
