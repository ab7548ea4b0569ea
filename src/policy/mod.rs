//! Transform policies plugged into the streaming engine.

pub mod prune;
pub mod rewrite;
pub mod split;
pub mod stats;

use serde::Serialize;

/// Counters kept by the policies that re-emit a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformCounts {
    /// Translation units seen inside `body`
    pub units: u64,
    /// Elements dropped together with their subtree
    pub elements_removed: u64,
    /// Attribute values changed by a substitution
    pub attributes_rewritten: u64,
}

/// A re-emitted document: the sink it was written to and what happened.
#[derive(Debug)]
pub struct Transformed<S> {
    /// Sink holding the output; file sinks still need `finish`
    pub sink: S,
    /// Counters for the document
    pub counts: TransformCounts,
}
