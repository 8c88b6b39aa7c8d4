//! Execution notifications.

use std::time::Duration;

use crate::mapping::StatementKind;

/// How the cache took part in an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The statement has no cache model, or caching is disabled.
    Uncached,
    Hit,
    Miss,
}

/// Raised after every statement execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionEvent {
    pub statement: String,
    pub kind: StatementKind,
    pub elapsed: Duration,
    /// Objects returned by a query, or rows affected by an update.
    pub rows: u64,
    pub cache: CacheOutcome,
}

/// Receives execution events.
pub trait ExecutionListener: Send + Sync {
    fn on_executed(&self, event: &ExecutionEvent);
}

impl<F> ExecutionListener for F
where
    F: Fn(&ExecutionEvent) + Send + Sync,
{
    fn on_executed(&self, event: &ExecutionEvent) {
        self(event)
    }
}
