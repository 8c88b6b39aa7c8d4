//! Statement execution.
//!
//! A call runs through: SQL evaluation, parameter binding, cache lookup,
//! command execution, row mapping, reader close, sub-select drain, output
//! parameter retrieval, cache population and finally an
//! [`ExecutionEvent`] for subscribed listeners.

mod event;
mod executor;
mod session;

pub use event::{CacheOutcome, ExecutionEvent, ExecutionListener};
pub use session::Session;
