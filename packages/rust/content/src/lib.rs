//! Markdown content store for Quire.
//!
//! Reads and rewrites the markdown articles that are the ground truth for the
//! site: frontmatter handling, whole-file persistence, and the paragraph
//! matching used to splice review comments into draft bodies.

pub mod frontmatter;
pub mod paragraphs;
pub mod store;

pub use frontmatter::Document;
pub use paragraphs::{
    COMMENT_MARKER, CommentPlan, Insertion, Paragraph, ReviewComment, apply_insertions,
    extract_paragraphs, paragraph_key, plan_comments,
};
pub use store::{ContentStore, StoredArticle, article_from_document, slug_for, write_atomic};
