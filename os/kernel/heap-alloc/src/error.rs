//! Allocator-level error conditions.

/// Failure modes surfaced by the allocator's public entry points.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    /// The region-extension primitive failed; no partial state was written.
    #[error("region extension failed: heap exhausted")]
    OutOfMemory,

    /// A heap invariant does not hold. Only raised by
    /// [`crate::Allocator::check_heap`] in debug/test builds; treated as a
    /// programming error, not a recoverable condition.
    #[error("heap invariant violated: {0}")]
    InvariantViolation(&'static str),
}
