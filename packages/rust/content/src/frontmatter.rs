//! YAML frontmatter split, parse, and render.
//!
//! Frontmatter is kept as an insertion-ordered [`Mapping`] so keys the tool
//! does not know about survive a read-modify-write cycle untouched.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use quire_shared::{QuireError, Result};

const DELIMITER: &str = "---";

/// A markdown file split into its frontmatter and body.
#[derive(Debug, Clone)]
pub struct Document {
    /// Frontmatter text exactly as found between the delimiters.
    raw_frontmatter: Option<String>,
    /// Parsed frontmatter.
    pub data: Mapping,
    /// Everything after the closing delimiter line.
    pub body: String,
}

impl Document {
    /// Build a document from parts (used by import).
    pub fn new(data: Mapping, body: impl Into<String>) -> Self {
        Self {
            raw_frontmatter: None,
            data,
            body: body.into(),
        }
    }

    /// Parse a markdown file. `path` is only used for error context.
    pub fn parse(input: &str, path: &Path) -> Result<Self> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let Some((front, body)) = split_frontmatter(input) else {
            return Ok(Self {
                raw_frontmatter: None,
                data: Mapping::new(),
                body: input.to_string(),
            });
        };

        let data = if front.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(front)
                .map_err(|e| QuireError::frontmatter(path, e.to_string()))?
            {
                Value::Mapping(map) => map,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(QuireError::frontmatter(
                        path,
                        "frontmatter is not a key/value mapping",
                    ));
                }
            }
        };

        Ok(Self {
            raw_frontmatter: Some(front.to_string()),
            data,
            body: body.to_string(),
        })
    }

    /// Render with freshly serialized frontmatter.
    pub fn render(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.data)
            .map_err(|e| QuireError::frontmatter("<render>", e.to_string()))?;
        Ok(assemble(&yaml, &self.body))
    }

    /// Render with the original frontmatter text and a replacement body.
    ///
    /// Falls back to serializing `data` when the file had no frontmatter.
    pub fn render_with_body(&self, body: &str) -> Result<String> {
        match &self.raw_frontmatter {
            Some(raw) => Ok(assemble(raw, body)),
            None => {
                let yaml = serde_yaml::to_string(&self.data)
                    .map_err(|e| QuireError::frontmatter("<render>", e.to_string()))?;
                Ok(assemble(&yaml, body))
            }
        }
    }

    /// String value for `key`, if present and a scalar.
    pub fn get_str(&self, key: &str) -> Option<String> {
        scalar_to_string(self.data.get(key)?)
    }

    /// Sequence of strings for `key`; scalars inside are stringified.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.data.get(key)? {
            Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Insert or overwrite `key`, keeping its original position if it existed.
    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(Value::String(key.to_string()), value);
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn assemble(yaml: &str, body: &str) -> String {
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);
    out
}

/// Split `---` delimited frontmatter from the body. Returns slices into the
/// input, or `None` when the file does not open with a delimiter line or
/// the block is never closed.
fn split_frontmatter(input: &str) -> Option<(&str, &str)> {
    let mut chunks = input.split_inclusive('\n');

    let first = chunks.next()?;
    if first.trim_end_matches(['\n', '\r']) != DELIMITER {
        return None;
    }

    let mut offset = first.len();
    for chunk in chunks {
        if chunk.trim_end_matches(['\n', '\r']) == DELIMITER {
            let front = &input[first.len()..offset];
            let body = &input[offset + chunk.len()..];
            return Some((front, body));
        }
        offset += chunk.len();
    }

    None
}
