//! Advisory progress events. Sinks are fire-and-forget; nothing depends on them.

use crate::types::SearchMode;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    DocumentStarted {
        document_id: String,
        index: usize,
        total: usize,
    },
    /// Emitted once per section or preamble, never per chunk.
    SectionSegmented {
        document_id: String,
        section_ordinal: i64,
        chunks: usize,
    },
    DocumentSegmented { document_id: String, chunks: usize },
    IndexRebuilt { mode: SearchMode, chunks: usize },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}
