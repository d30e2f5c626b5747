//! Orchestration for Quire: enrichment, review, and brainstorm import.
//!
//! Each run walks the content store sequentially, talks to the provider
//! chain, and rewrites an article only once a fully validated result is in
//! hand.

mod batch;
pub mod enrichment;
pub mod import;
pub mod progress;
pub mod prompt;
pub mod response;
pub mod review;

#[cfg(test)]
mod test_support;

pub use enrichment::{EnrichOptions, EnrichSummary, merge_enrichment, run_enrichment};
pub use import::{ImportOptions, ImportSummary, run_import};
pub use progress::{RunProgress, SilentProgress};
pub use review::{ReviewOptions, ReviewSummary, ReviewTarget, run_review};
