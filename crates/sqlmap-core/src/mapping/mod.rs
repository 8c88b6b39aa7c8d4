//! Statement, parameter, result and cache descriptors.
//!
//! Descriptors are plain data assembled by the caller (or a configuration
//! loader) and handed to [`crate::SqlMapBuilder`], which resolves references
//! between them once. They are immutable afterwards.

mod cache_model;
mod parameter;
mod result;
mod statement;

pub use cache_model::{CacheModelDef, CachePolicy};
pub use parameter::{ParameterMap, ParameterProperty};
pub use result::{Discriminator, ResultMap, ResultProperty, SubMap};
pub use statement::{KeyTiming, SelectKey, SqlFragment, StatementDef, StatementKind};
