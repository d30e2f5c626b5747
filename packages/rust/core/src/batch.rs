//! Item selection and pacing shared by batch runs.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use quire_content::ContentStore;
use quire_shared::Result;

/// Files a run should walk: the single target, or the whole store.
///
/// A missing target is an error for the whole run. A missing content
/// directory is not: there is simply nothing to do.
pub(crate) fn select_items(store: &ContentStore, target: Option<&str>) -> Result<Vec<PathBuf>> {
    if let Some(target) = target {
        return Ok(vec![store.resolve(target)?]);
    }
    if !store.exists() {
        warn!(root = %store.root().display(), "content directory not found");
        return Ok(Vec::new());
    }
    store.list()
}

/// Sleep between successive items. No pause after the last one.
pub(crate) async fn pace(index: usize, total: usize, delay: Duration) {
    if index + 1 < total && !delay.is_zero() {
        debug!(delay_ms = delay.as_millis() as u64, "pacing before next item");
        tokio::time::sleep(delay).await;
    }
}
