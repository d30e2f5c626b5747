//! Prompt assembly for enrichment and review calls.

use quire_shared::Article;

/// Extraction prompt; the article body follows it, then a closing `"""`.
pub const ENRICH_PROMPT: &str = r#"Extract metadata from the article below for a knowledge base.

Return ONLY valid JSON. No markdown. No explanation.

{
  "summary": "Core principle in 1-2 sentences (20-50 words)",
  "highlights": ["actionable takeaway 1", "actionable takeaway 2", "actionable takeaway 3"],
  "topic": "mental-models|decision-making|learning|productivity|investing|psychology|leadership|communication",
  "secondary_topic": "same options or null",
  "related_concepts": ["kebab-case-concept-1", "kebab-case-concept-2"],
  "scope": "When/where this insight applies (1 sentence)",
  "anti_pattern": "How people commonly misapply this (1 sentence)"
}

RULES:
1. summary: State the mechanism, not a title restatement
2. highlights: Exactly 3. Each useful standalone.
3. topic: Pick ONE from the list
4. secondary_topic: Only if >30% content overlap, else null
5. related_concepts: 2-4 items, kebab-case
6. scope: Boundary condition for application
7. anti_pattern: Common misuse pattern

Before responding, verify:
- JSON is syntactically valid
- topic matches allowed list exactly
- highlights has exactly 3 items

ARTICLE:
"""
"#;

/// First `max_chars` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Full enrichment prompt for an article body.
pub fn enrichment_prompt(body: &str, max_chars: usize) -> String {
    format!("{ENRICH_PROMPT}{}\n\"\"\"", truncate_chars(body, max_chars))
}

/// Review input: title, optional WIP notes, then the body; truncated.
pub fn review_input(article: &Article, max_chars: usize) -> String {
    let mut input = format!("Title: {}\n\n", article.title);
    if let Some(notes) = article.wip_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        input.push_str(&format!("WIP Notes: {notes}\n\n"));
    }
    input.push_str("Content:\n");
    input.push_str(&article.body);
    truncate_chars(&input, max_chars).to_string()
}

/// Configured review instructions wrapped around the review input.
pub fn review_prompt(instructions: &str, input: &str) -> String {
    format!("{instructions}\n\"\"\"{input}\n\"\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_shared::{Status, Visibility};

    fn article(body: &str, notes: Option<&str>) -> Article {
        Article {
            slug: "s".into(),
            title: "My Draft".into(),
            date: None,
            tags: vec![],
            status: Status::Draft,
            visibility: Visibility::Public,
            wip_notes: notes.map(String::from),
            body: body.into(),
            enrichment: None,
            enriched_at: None,
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn enrichment_prompt_wraps_truncated_body() {
        let body = "a".repeat(10_000);
        let prompt = enrichment_prompt(&body, 6000);
        assert!(prompt.starts_with("Extract metadata"));
        assert!(prompt.ends_with(&format!("{}\n\"\"\"", "a".repeat(6000))));
        assert!(!prompt.contains(&"a".repeat(6001)));
    }

    #[test]
    fn review_input_includes_notes_when_present() {
        let with = review_input(&article("Body text", Some("cut section 2")), 1000);
        assert_eq!(
            with,
            "Title: My Draft\n\nWIP Notes: cut section 2\n\nContent:\nBody text"
        );
        let without = review_input(&article("Body text", None), 1000);
        assert_eq!(without, "Title: My Draft\n\nContent:\nBody text");
    }

    #[test]
    fn review_input_is_truncated() {
        let input = review_input(&article(&"x".repeat(500), None), 50);
        assert_eq!(input.chars().count(), 50);
    }

    #[test]
    fn review_prompt_fences_input() {
        assert_eq!(review_prompt("Review:", "body"), "Review:\n\"\"\"body\n\"\"\"");
    }
}
