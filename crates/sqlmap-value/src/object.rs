//! Named records and deferred loads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Type name given to dictionary-like objects.
pub const MAP_TYPE: &str = "map";

/// A named record with ordered members.
///
/// Objects created with [`Object::map`] act like dictionaries: reading a
/// member that was never set yields null. Objects of any other type are
/// strict and the property accessor reports absent members as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    type_name: String,
    members: Vec<(String, Value)>,
}

impl Object {
    /// Create an empty object of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    /// Create an empty dictionary-like object.
    pub fn map() -> Self {
        Self::new(MAP_TYPE)
    }

    /// Builder-style member assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// The object's type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether absent members read as null.
    pub fn is_map(&self) -> bool {
        self.type_name == MAP_TYPE
    }

    /// Get a member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a mutable member by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.members
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Set a member, returning the previous value if there was one.
    ///
    /// New members are appended, so member order follows first assignment.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.members.push((name, value));
                None
            }
        }
    }

    /// Get a member, inserting `default()` first when absent.
    pub fn get_or_insert_with(
        &mut self,
        name: &str,
        default: impl FnOnce() -> Value,
    ) -> &mut Value {
        let index = match self.members.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.members.push((name.to_string(), default()));
                self.members.len() - 1
            }
        };
        &mut self.members[index].1
    }

    /// Check whether a member exists.
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|(n, _)| n == name)
    }

    /// Remove a member.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.members.iter().position(|(n, _)| n == name)?;
        Some(self.members.remove(index).1)
    }

    /// Iterate over members in order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterate mutably over member values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.members.iter_mut().map(|(_, v)| v)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the object has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::map()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name)?;
        for (i, (name, value)) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

/// A sub-query that will populate a member when the owning graph is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deferred {
    /// Id of the statement to run.
    pub statement: String,
    /// Parameter object for that statement.
    pub parameter: Box<Value>,
    /// Whether the member expects a list rather than a single object.
    pub many: bool,
}

impl Deferred {
    /// Create a deferred load.
    pub fn new(statement: impl Into<String>, parameter: Value, many: bool) -> Self {
        Self {
            statement: statement.into(),
            parameter: Box::new(parameter),
            many,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut obj = Object::new("User").with("id", 1i32).with("name", "a");
        let old = obj.set("id", Value::Int32(2));

        assert_eq!(old, Some(Value::Int32(1)));
        let names: Vec<&str> = obj.members().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut obj = Object::new("Order");
        obj.get_or_insert_with("items", || Value::List(vec![]))
            .as_list_mut()
            .unwrap()
            .push("X".into());
        obj.get_or_insert_with("items", || Value::Null)
            .as_list_mut()
            .unwrap()
            .push("Y".into());

        assert_eq!(obj.get("items"), Some(&Value::list(["X", "Y"])));
    }

    #[test]
    fn test_map_flag_and_display() {
        assert!(Object::map().is_map());
        assert!(!Object::new("User").is_map());
        let obj = Object::new("User").with("id", 3i64);
        assert_eq!(obj.to_string(), "User{id=3}");
    }
}
