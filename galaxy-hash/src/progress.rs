//! Progress reporting capability shared across bulk operations.

/// Capability interface for reporting progress from a long-running operation.
///
/// Bulk operations throughout the workspace take `Option<&dyn ProgressSink>`
/// explicitly rather than embedding a closure in their option structs, so the same
/// sink can be shared across many concurrent workers.
pub trait ProgressSink: Send + Sync {
    /// Called as bytes (or items) complete. `done` and `total` share a unit chosen
    /// by the caller (bytes for streaming hashes and downloads, item counts for
    /// chunk/file enumeration).
    fn on_progress(&self, done: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, done: u64, total: u64) {
        self(done, total)
    }
}
