//! Per-call mapping state.

use std::collections::VecDeque;

use sqlmap_value::Value;

use crate::capability::PropertyPath;

/// A sub-select discovered while mapping one object, addressed relative to
/// that object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingSelect {
    pub path: PropertyPath,
    pub statement: String,
    pub parameter: Value,
    pub many: bool,
}

impl PendingSelect {
    /// Re-address under `prefix`.
    pub fn under(mut self, prefix: &PropertyPath) -> Self {
        self.path = prefix.join(&self.path);
        self
    }
}

/// A queued sub-select, addressed from a top-level result.
#[derive(Debug, Clone, PartialEq)]
pub struct PostBinding {
    /// Index of the top-level result the target member belongs to.
    pub root: usize,
    /// Member to populate.
    pub path: PropertyPath,
    /// Statement to run.
    pub statement: String,
    pub parameter: Value,
    /// Whether the member receives a list.
    pub many: bool,
}

/// State threaded through one statement execution.
///
/// Sub-selects are queued here while rows are read and drained in FIFO
/// order once the reader is closed.
#[derive(Debug, Default)]
pub struct RequestScope {
    statement: String,
    queue: VecDeque<PostBinding>,
}

impl RequestScope {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            queue: VecDeque::new(),
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub(crate) fn enqueue(&mut self, root: usize, pending: PendingSelect) {
        self.queue.push_back(PostBinding {
            root,
            path: pending.path,
            statement: pending.statement,
            parameter: pending.parameter,
            many: pending.many,
        });
    }

    /// Next queued sub-select.
    pub fn next_binding(&mut self) -> Option<PostBinding> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
