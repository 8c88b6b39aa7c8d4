//! Turning result sets into objects.
//!
//! [`ResultMapper`] maps rows with the flattened result maps of a
//! [`crate::SqlMap`]. Sub-selects found while mapping are not executed
//! inline: they are queued on the [`RequestScope`] and run once the reader
//! that produced them is closed.

mod mapper;
mod scope;

pub use mapper::ResultMapper;
pub use scope::{PostBinding, RequestScope};
