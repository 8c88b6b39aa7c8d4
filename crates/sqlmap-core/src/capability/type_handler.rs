//! Conversions between driver values and object values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sqlmap_value::Value;

use crate::driver::{ColumnRef, Row};
use crate::error::Error;

/// Converts values crossing the driver boundary.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Name the handler is registered under.
    fn name(&self) -> &str;

    /// Convert a value read from the database.
    fn from_database_value(&self, value: Value) -> Result<Value, Error>;

    /// Read and convert a column of `row`.
    fn get_value(&self, row: &Row, column: ColumnRef<'_>) -> Result<Value, Error> {
        let value = row
            .get(column)
            .cloned()
            .ok_or_else(|| Error::mapping(format!("column '{}' not found in result", column)))?;
        self.from_database_value(value)
    }

    /// Convert a parameter value before it is handed to the driver.
    fn to_database_value(&self, value: &Value) -> Result<Value, Error>;

    /// Parse a configured literal, such as a null-substitution value.
    fn value_of(&self, literal: &str) -> Result<Value, Error>;

    /// The value used when the database returns null.
    fn null_value(&self) -> Value {
        Value::Null
    }
}

/// Target type of a built-in handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Bytes,
    Timestamp,
    /// Values pass through unchanged.
    Any,
}

impl ScalarKind {
    fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float32 => "float",
            ScalarKind::Float64 => "double",
            ScalarKind::Bool => "bool",
            ScalarKind::Bytes => "bytes",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Any => "any",
        }
    }

    /// Convert `value` to this kind. Null always stays null.
    pub fn convert(self, value: Value) -> Result<Value, String> {
        if value.is_null() || self == ScalarKind::Any {
            return Ok(value);
        }
        let converted = match self {
            ScalarKind::String => match &value {
                Value::String(_) => Some(value.clone()),
                v if v.is_scalar() => Some(Value::String(v.to_string())),
                _ => None,
            },
            ScalarKind::Int32 => integer(&value)
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int32),
            ScalarKind::Int64 => integer(&value).map(Value::Int64),
            ScalarKind::Float32 => float(&value).map(|f| Value::Float32(f as f32)),
            ScalarKind::Float64 => float(&value).map(Value::Float64),
            ScalarKind::Bool => boolean(&value).map(Value::Bool),
            ScalarKind::Bytes => match &value {
                Value::Bytes(_) => Some(value.clone()),
                Value::String(s) => Some(Value::Bytes(s.as_bytes().to_vec())),
                _ => None,
            },
            ScalarKind::Timestamp => integer(&value).map(Value::Timestamp),
            ScalarKind::Any => Some(value.clone()),
        };
        converted.ok_or_else(|| {
            format!(
                "cannot convert {} value '{}' to {}",
                value.type_name(),
                value,
                self.name()
            )
        })
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int32(i) => Some(*i as i64),
        Value::Int64(i) | Value::Timestamp(i) => Some(*i),
        Value::Bool(b) => Some(*b as i64),
        Value::Float32(f) => Some(*f as i64),
        Value::Float64(f) => Some(*f as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(*b as i64 as f64),
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int32(i) => Some(*i != 0),
        Value::Int64(i) => Some(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "y" | "yes" => Some(true),
            "false" | "0" | "n" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Built-in handler converting to one [`ScalarKind`].
#[derive(Debug, Clone)]
pub struct ScalarTypeHandler {
    name: String,
    kind: ScalarKind,
}

impl ScalarTypeHandler {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
}

impl TypeHandler for ScalarTypeHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn from_database_value(&self, value: Value) -> Result<Value, Error> {
        self.kind.convert(value).map_err(Error::Mapping)
    }

    fn to_database_value(&self, value: &Value) -> Result<Value, Error> {
        self.kind.convert(value.clone()).map_err(Error::Binding)
    }

    fn value_of(&self, literal: &str) -> Result<Value, Error> {
        self.kind
            .convert(Value::String(literal.to_string()))
            .map_err(Error::Configuration)
    }
}

const BUILTINS: [(&str, ScalarKind); 16] = [
    ("string", ScalarKind::String),
    ("int", ScalarKind::Int32),
    ("int32", ScalarKind::Int32),
    ("integer", ScalarKind::Int32),
    ("long", ScalarKind::Int64),
    ("int64", ScalarKind::Int64),
    ("float", ScalarKind::Float32),
    ("single", ScalarKind::Float32),
    ("double", ScalarKind::Float64),
    ("decimal", ScalarKind::Float64),
    ("bool", ScalarKind::Bool),
    ("boolean", ScalarKind::Bool),
    ("bytes", ScalarKind::Bytes),
    ("timestamp", ScalarKind::Timestamp),
    ("datetime", ScalarKind::Timestamp),
    ("any", ScalarKind::Any),
];

/// Type handlers by declared type name and optional database type.
///
/// Type names are matched case-insensitively. A lookup without a declared
/// type yields the passthrough handler.
#[derive(Clone)]
pub struct TypeHandlerRegistry {
    by_type: HashMap<String, Arc<dyn TypeHandler>>,
    by_db_type: HashMap<(String, String), Arc<dyn TypeHandler>>,
    passthrough: Arc<dyn TypeHandler>,
}

impl fmt::Debug for TypeHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_type.keys().collect();
        names.sort();
        f.debug_struct("TypeHandlerRegistry")
            .field("types", &names)
            .field("db_types", &self.by_db_type.len())
            .finish()
    }
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHandlerRegistry {
    /// Create a registry holding the built-in handlers.
    pub fn new() -> Self {
        let by_type = BUILTINS
            .iter()
            .map(|(name, kind)| {
                let handler: Arc<dyn TypeHandler> = Arc::new(ScalarTypeHandler::new(*name, *kind));
                (name.to_string(), handler)
            })
            .collect();
        Self {
            by_type,
            by_db_type: HashMap::new(),
            passthrough: Arc::new(ScalarTypeHandler::new("any", ScalarKind::Any)),
        }
    }

    /// Register a handler for a type name, replacing any previous one.
    pub fn register(&mut self, type_name: &str, handler: Arc<dyn TypeHandler>) {
        self.by_type.insert(type_name.to_ascii_lowercase(), handler);
    }

    /// Register a handler used only when both type and database type match.
    pub fn register_for_db_type(
        &mut self,
        type_name: &str,
        db_type: &str,
        handler: Arc<dyn TypeHandler>,
    ) {
        self.by_db_type.insert(
            (type_name.to_ascii_lowercase(), db_type.to_ascii_lowercase()),
            handler,
        );
    }

    /// Whether a handler is registered for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.by_type.contains_key(&type_name.to_ascii_lowercase())
    }

    /// The passthrough handler.
    pub fn passthrough(&self) -> Arc<dyn TypeHandler> {
        Arc::clone(&self.passthrough)
    }

    /// Resolve the handler for a declared type and database type.
    pub fn resolve(
        &self,
        type_name: Option<&str>,
        db_type: Option<&str>,
    ) -> Result<Arc<dyn TypeHandler>, Error> {
        let Some(type_name) = type_name else {
            return Ok(self.passthrough());
        };
        let type_key = type_name.to_ascii_lowercase();
        if let Some(db_type) = db_type {
            let key = (type_key.clone(), db_type.to_ascii_lowercase());
            if let Some(handler) = self.by_db_type.get(&key) {
                return Ok(Arc::clone(handler));
            }
        }
        self.by_type
            .get(&type_key)
            .cloned()
            .ok_or_else(|| Error::config(format!("no type handler registered for '{}'", type_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_conversions() {
        let registry = TypeHandlerRegistry::new();
        let int = registry.resolve(Some("int"), None).unwrap();
        assert_eq!(int.from_database_value(Value::Int64(5)).unwrap(), Value::Int32(5));
        assert_eq!(int.value_of("-1").unwrap(), Value::Int32(-1));
        assert!(int.from_database_value(Value::from("x")).is_err());
        assert!(int.from_database_value(Value::Int64(i64::MAX)).is_err());

        let text = registry.resolve(Some("String"), None).unwrap();
        assert_eq!(text.from_database_value(Value::Int64(5)).unwrap(), Value::from("5"));

        let flag = registry.resolve(Some("bool"), None).unwrap();
        assert_eq!(flag.from_database_value(Value::Int64(1)).unwrap(), Value::Bool(true));
        assert_eq!(flag.from_database_value(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let registry = TypeHandlerRegistry::new();
        let err = registry.resolve(Some("money"), None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_passthrough_and_db_type_override() {
        let mut registry = TypeHandlerRegistry::new();
        let any = registry.resolve(None, None).unwrap();
        assert_eq!(any.from_database_value(Value::Int64(3)).unwrap(), Value::Int64(3));

        registry.register_for_db_type(
            "string",
            "BLOB",
            Arc::new(ScalarTypeHandler::new("blob-string", ScalarKind::Bytes)),
        );
        let handler = registry.resolve(Some("string"), Some("blob")).unwrap();
        assert_eq!(handler.name(), "blob-string");
        let handler = registry.resolve(Some("string"), Some("VARCHAR")).unwrap();
        assert_eq!(handler.name(), "string");
    }

    #[test]
    fn test_get_value_from_row() {
        let registry = TypeHandlerRegistry::new();
        let columns: Arc<[String]> = vec!["ID".to_string()].into();
        let row = Row::new(columns, vec![Value::Int64(9)]);
        let long = registry.resolve(Some("long"), None).unwrap();

        assert_eq!(long.get_value(&row, ColumnRef::Name("id")).unwrap(), Value::Int64(9));
        assert!(long.get_value(&row, ColumnRef::Name("other")).is_err());
    }
}
