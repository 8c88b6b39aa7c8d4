//! Construction of result objects.

use sqlmap_value::{Object, Value, MAP_TYPE};

use crate::error::Error;

/// Builds result objects and collections.
pub trait ObjectFactory: Send + Sync {
    /// Create an instance of `type_name` from constructor arguments.
    ///
    /// `args` is empty for a parameterless construction.
    fn create(&self, type_name: &str, args: Vec<(String, Value)>) -> Result<Value, Error>;

    /// Create an empty collection for a list-valued member.
    fn create_list(&self, _element_type: Option<&str>) -> Value {
        Value::List(Vec::new())
    }
}

/// Default factory producing [`Value::Object`] records.
///
/// Constructor arguments become the first members of the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFactory;

impl ObjectFactory for RecordFactory {
    fn create(&self, type_name: &str, args: Vec<(String, Value)>) -> Result<Value, Error> {
        if type_name.is_empty() {
            return Err(Error::mapping("cannot create an object without a type name"));
        }
        let mut object = if type_name.eq_ignore_ascii_case(MAP_TYPE) {
            Object::map()
        } else {
            Object::new(type_name)
        };
        for (name, value) in args {
            object.set(name, value);
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_record() {
        let value = RecordFactory
            .create("Account", vec![("id".into(), Value::Int32(1))])
            .unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.type_name(), "Account");
        assert_eq!(obj.get("id"), Some(&Value::Int32(1)));
    }

    #[test]
    fn test_create_map_and_list() {
        let value = RecordFactory.create("Map", vec![]).unwrap();
        assert!(value.as_object().unwrap().is_map());
        assert_eq!(RecordFactory.create_list(None), Value::List(vec![]));
        assert!(RecordFactory.create("", vec![]).is_err());
    }
}
