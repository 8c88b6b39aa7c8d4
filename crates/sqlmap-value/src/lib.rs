//! Runtime values for sqlmap.
//!
//! Parameter objects handed to a statement, rows coming back from a driver and
//! the object graphs produced by result mapping are all expressed with the
//! types in this crate.
//!
//! # Modules
//!
//! - [`value`] - The [`Value`] enum and its comparison/coercion helpers
//! - [`object`] - Named records ([`Object`]) and lazily loaded placeholders
//! - [`codec`] - Canonical byte encoding used to fingerprint values
//! - [`error`] - Conversion errors
//!
//! # Example
//!
//! ```rust
//! use sqlmap_value::{Object, Value};
//!
//! let order = Object::new("Order")
//!     .with("id", 7i64)
//!     .with("lines", Value::List(vec!["X".into(), "Y".into()]));
//!
//! let value = Value::from(order);
//! assert_eq!(value.as_object().unwrap().get("id"), Some(&Value::Int64(7)));
//! ```

pub mod codec;
pub mod error;
pub mod object;
pub mod value;

pub use error::Error;
pub use object::{Deferred, Object, MAP_TYPE};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_json_roundtrip() {
        let value = Value::from(
            Object::new("Order")
                .with("id", 1i32)
                .with("lines", Value::List(vec!["a".into(), Value::Null])),
        );
        let json = serde_json::to_vec(&value).unwrap();
        let decoded: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value, decoded);
    }
}
