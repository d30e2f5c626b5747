//! Core domain types for the content store.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status / Visibility
// ---------------------------------------------------------------------------

/// Publication status of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
}

impl Status {
    /// Read a frontmatter value. Anything other than `draft` is published.
    pub fn from_frontmatter(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("draft") => Self::Draft,
            _ => Self::Published,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// Where an article is listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Hidden,
}

impl Visibility {
    /// Read a frontmatter value. Anything other than `hidden` is public.
    pub fn from_frontmatter(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("hidden") => Self::Hidden,
            _ => Self::Public,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Hidden => "hidden",
        }
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Closed category set for enrichment topics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    #[default]
    MentalModels,
    DecisionMaking,
    Learning,
    Productivity,
    Investing,
    Psychology,
    Leadership,
    Communication,
}

impl Topic {
    /// Every topic, in prompt order.
    pub const ALL: [Topic; 8] = [
        Topic::MentalModels,
        Topic::DecisionMaking,
        Topic::Learning,
        Topic::Productivity,
        Topic::Investing,
        Topic::Psychology,
        Topic::Leadership,
        Topic::Communication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MentalModels => "mental-models",
            Self::DecisionMaking => "decision-making",
            Self::Learning => "learning",
            Self::Productivity => "productivity",
            Self::Investing => "investing",
            Self::Psychology => "psychology",
            Self::Leadership => "leadership",
            Self::Communication => "communication",
        }
    }

    /// Exact match against the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// LLM-generated metadata merged into an article's frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Core principle in one or two sentences.
    pub summary: String,
    /// Exactly three standalone takeaways.
    pub highlights: Vec<String>,
    pub topic: Topic,
    pub secondary_topic: Option<Topic>,
    /// Two to four kebab-case concept slugs.
    pub related_concepts: Vec<String>,
    /// When/where the insight applies.
    pub scope: String,
    /// How the insight is commonly misapplied.
    pub anti_pattern: String,
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A content item as read from the store.
#[derive(Debug, Clone)]
pub struct Article {
    /// File stem of the markdown file.
    pub slug: String,
    pub title: String,
    /// Authoring date as written in frontmatter (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// Tags in authoring order.
    pub tags: Vec<String>,
    pub status: Status,
    pub visibility: Visibility,
    /// Free-form author notes for drafts.
    pub wip_notes: Option<String>,
    /// Markdown body after the frontmatter block.
    pub body: String,
    /// Present only when every enrichment field is present.
    pub enrichment: Option<Enrichment>,
    /// Idempotency marker. Presence alone means "already enriched".
    pub enriched_at: Option<String>,
}

impl Article {
    pub fn is_enriched(&self) -> bool {
        self.enriched_at.is_some()
    }

    pub fn is_draft(&self) -> bool {
        self.status == Status::Draft
    }
}
