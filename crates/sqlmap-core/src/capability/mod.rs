//! Capabilities the pipeline consumes but does not define the policy of.
//!
//! - [`PropertyAccessor`] reads and writes members of parameter and result
//!   objects along dotted paths
//! - [`TypeHandler`] converts between driver values and object values
//! - [`ObjectFactory`] builds result objects and lists
//!
//! Each comes with a default implementation over [`sqlmap_value::Value`].

mod accessor;
mod factory;
mod type_handler;

pub use accessor::{ObjectAccessor, PathSegment, PropertyAccessor, PropertyPath};
pub use factory::{ObjectFactory, RecordFactory};
pub use type_handler::{ScalarKind, ScalarTypeHandler, TypeHandler, TypeHandlerRegistry};
