//! Helpers shared by orchestrator tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quire_providers::{Provider, ProviderChain, ProviderOutcome};

/// A complete, well-formed enrichment reply wrapped in a code fence.
pub(crate) const VALID_ENRICHMENT: &str = r#"```json
{
  "summary": "Retrieval practice strengthens memory more than re-reading does.",
  "highlights": ["Test yourself", "Space sessions out", "Mix topics"],
  "topic": "learning",
  "secondary_topic": "productivity",
  "related_concepts": ["spaced-repetition", "Desirable Difficulty"],
  "scope": "Applies to durable learning of factual material.",
  "anti_pattern": "Mistaking fluency while re-reading for mastery."
}
```"#;

/// Shared call counter handed back to tests.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub(crate) fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Provider that replays queued outcomes; once empty it reports failure.
pub(crate) struct ScriptedProvider {
    name: String,
    outcomes: Mutex<VecDeque<ProviderOutcome>>,
    calls: CallLog,
}

impl ScriptedProvider {
    pub(crate) fn new(name: &str, outcomes: Vec<ProviderOutcome>) -> (Box<dyn Provider>, CallLog) {
        let calls = CallLog::default();
        let provider = Self {
            name: name.to_string(),
            outcomes: Mutex::new(outcomes.into()),
            calls: calls.clone(),
        };
        (Box::new(provider), calls)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> ProviderOutcome {
        self.calls.0.lock().unwrap().push(prompt.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProviderOutcome::Failure {
                message: "script exhausted".into(),
                rate_limited: false,
            })
    }
}

pub(crate) fn chain_of(providers: Vec<Box<dyn Provider>>) -> ProviderChain {
    ProviderChain::new(providers)
}

/// Write `<slug>.md` into `dir` and return its path.
pub(crate) fn write_article(dir: &Path, slug: &str, contents: &str) -> PathBuf {
    let path = dir.join(format!("{slug}.md"));
    std::fs::write(&path, contents).expect("write article fixture");
    path
}
