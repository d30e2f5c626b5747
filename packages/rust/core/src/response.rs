//! Parsing and normalization of provider replies.
//!
//! Parsing is strict: a reply that is not JSON once code fences are stripped
//! is a [`QuireError::Parse`], which callers may retry. Normalization is
//! lenient: whatever JSON came back is repaired into a complete
//! [`Enrichment`] and never rejected.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use quire_content::ReviewComment;
use quire_shared::{Enrichment, QuireError, Result, Topic};

/// Required number of highlights.
pub const HIGHLIGHT_COUNT: usize = 3;

/// Upper bound on related concepts.
pub const MAX_RELATED_CONCEPTS: usize = 4;

/// Remove markdown code-fence markers (```` ``` ```` / ```` ```json ````) and trim.
pub fn strip_code_fences(text: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"```(?i:json)?[ \t]*\r?\n?").expect("valid regex")
    });
    FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Strip fences and parse the remainder as JSON.
pub fn parse_json(text: &str) -> Result<Value> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| QuireError::parse(format!("invalid JSON: {e}")))
}

/// Parse and normalize an enrichment reply.
pub fn parse_enrichment(text: &str) -> Result<Enrichment> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(QuireError::parse("expected a JSON object"));
    }
    Ok(normalize_enrichment(&value))
}

/// Repair arbitrary JSON into a complete enrichment. Never fails.
pub fn normalize_enrichment(value: &Value) -> Enrichment {
    let mut highlights: Vec<String> = string_list(value.get("highlights"))
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    highlights.truncate(HIGHLIGHT_COUNT);
    highlights.resize(HIGHLIGHT_COUNT, String::new());

    let mut related_concepts: Vec<String> = Vec::new();
    for concept in string_list(value.get("related_concepts")) {
        let kebab = to_kebab_case(&concept);
        if !kebab.is_empty() && !related_concepts.contains(&kebab) {
            related_concepts.push(kebab);
        }
    }
    related_concepts.truncate(MAX_RELATED_CONCEPTS);

    Enrichment {
        summary: string_field(value.get("summary")),
        highlights,
        topic: topic_field(value.get("topic")).unwrap_or_default(),
        secondary_topic: topic_field(value.get("secondary_topic")),
        related_concepts,
        scope: string_field(value.get("scope")),
        anti_pattern: string_field(value.get("anti_pattern")),
    }
}

/// Parse a review reply into comments. Entries without both a paragraph
/// start and a comment are dropped.
pub fn parse_review(text: &str) -> Result<Vec<ReviewComment>> {
    let value = parse_json(text)?;
    let items = match value {
        Value::Object(mut map) => match map.remove("comments") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(QuireError::parse("`comments` is not an array")),
        },
        Value::Array(items) => items,
        _ => return Err(QuireError::parse("expected a JSON object with `comments`")),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ReviewComment>(item).ok())
        .filter(|c| !c.paragraph_start.trim().is_empty() && !c.comment.trim().is_empty())
        .collect())
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn topic_field(value: Option<&Value>) -> Option<Topic> {
    match value {
        Some(Value::String(s)) => Topic::parse(&s.trim().to_ascii_lowercase()),
        _ => None,
    }
}

/// `"Second Order Thinking"` → `"second-order-thinking"`.
pub fn to_kebab_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_enrichment("Sure! Here is your metadata.").unwrap_err();
        assert!(err.is_parse());
        assert!(parse_enrichment("[1, 2]").unwrap_err().is_parse());
    }

    #[test]
    fn five_highlights_truncate_to_three() {
        let e = normalize_enrichment(&json!({
            "highlights": ["1", "2", "3", "4", "5"]
        }));
        assert_eq!(e.highlights, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_highlights_pad_to_three() {
        let e = normalize_enrichment(&json!({ "highlights": ["only one"] }));
        assert_eq!(e.highlights, vec!["only one", "", ""]);
        let e = normalize_enrichment(&json!({}));
        assert_eq!(e.highlights.len(), HIGHLIGHT_COUNT);
    }

    #[test]
    fn invalid_topic_becomes_default() {
        let e = normalize_enrichment(&json!({ "topic": "cooking" }));
        assert_eq!(e.topic, Topic::MentalModels);
        let e = normalize_enrichment(&json!({ "topic": "Investing " }));
        assert_eq!(e.topic, Topic::Investing);
        let e = normalize_enrichment(&json!({ "topic": 7 }));
        assert_eq!(e.topic, Topic::MentalModels);
    }

    #[test]
    fn invalid_secondary_topic_becomes_null() {
        let e = normalize_enrichment(&json!({ "secondary_topic": "gardening" }));
        assert_eq!(e.secondary_topic, None);
        let e = normalize_enrichment(&json!({ "secondary_topic": null }));
        assert_eq!(e.secondary_topic, None);
        let e = normalize_enrichment(&json!({ "secondary_topic": "learning" }));
        assert_eq!(e.secondary_topic, Some(Topic::Learning));
    }

    #[test]
    fn related_concepts_are_kebab_cased_deduped_and_capped() {
        let e = normalize_enrichment(&json!({
            "related_concepts": ["Second Order Thinking", "second-order-thinking", "  ", "Inversion", "a", "b", "c"]
        }));
        assert_eq!(
            e.related_concepts,
            vec!["second-order-thinking", "inversion", "a", "b"]
        );
    }

    #[test]
    fn missing_text_fields_become_empty() {
        let e = normalize_enrichment(&json!({ "summary": "S" }));
        assert_eq!(e.summary, "S");
        assert_eq!(e.scope, "");
        assert_eq!(e.anti_pattern, "");
    }

    #[test]
    fn full_fenced_reply_parses() {
        let reply = "```json\n{\"summary\":\"Mechanism.\",\"highlights\":[\"a\",\"b\",\"c\"],\"topic\":\"learning\",\"secondary_topic\":null,\"related_concepts\":[\"spaced-repetition\",\"recall\"],\"scope\":\"Study.\",\"anti_pattern\":\"Cramming.\"}\n```";
        let e = parse_enrichment(reply).expect("parse");
        assert_eq!(e.summary, "Mechanism.");
        assert_eq!(e.topic, Topic::Learning);
        assert_eq!(e.related_concepts, vec!["spaced-repetition", "recall"]);
    }

    #[test]
    fn sloppy_fixture_reply_is_repaired() {
        let reply = include_str!("../../../../fixtures/responses/enrichment.json");
        let e = parse_enrichment(reply).expect("parse");
        assert_eq!(e.highlights.len(), HIGHLIGHT_COUNT);
        assert_eq!(e.topic, Topic::Learning);
        assert_eq!(e.secondary_topic, None);
        assert_eq!(
            e.related_concepts,
            vec!["retrieval-practice", "forgetting-curve", "desirable-difficulty", "interleaving"]
        );
    }

    #[test]
    fn review_reply_parses_and_filters() {
        let reply = r#"{"comments":[
            {"paragraph_start":"The first paragraph","comment":"Vague."},
            {"paragraph_start":"","comment":"no target"},
            {"paragraph_start":"Another","comment":"  "},
            {"unexpected": true}
        ]}"#;
        let comments = parse_review(reply).expect("parse");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment, "Vague.");
    }

    #[test]
    fn review_reply_without_comments_is_empty() {
        assert!(parse_review("{\"comments\": []}").unwrap().is_empty());
        assert!(parse_review("{}").unwrap().is_empty());
        assert!(parse_review("not json").unwrap_err().is_parse());
        assert!(parse_review("{\"comments\": \"none\"}").unwrap_err().is_parse());
    }

    #[test]
    fn kebab_case_conversion() {
        assert_eq!(to_kebab_case("First Principles"), "first-principles");
        assert_eq!(to_kebab_case("  --Map/Territory--  "), "map-territory");
        assert_eq!(to_kebab_case("already-kebab"), "already-kebab");
    }
}
