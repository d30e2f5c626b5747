//! Progress callbacks shared by the enrichment and review runs.

/// Progress callback for batch runs.
pub trait RunProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an item is processed.
    fn item(&self, current: usize, total: usize, slug: &str);
    /// Full prompt about to be sent, when the operator asked to see it.
    fn prompt(&self, _slug: &str, _prompt: &str) {}
    /// Called once the run is over.
    fn finish(&self);
}

/// No-op progress for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _slug: &str) {}
    fn finish(&self) {}
}
