//! Property access over dotted paths.

use std::fmt;

use sqlmap_value::{Object, Value};

use crate::error::Error;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Member(String),
    Index(usize),
}

/// A parsed property path such as `order.lines[2].sku`.
///
/// The empty path refers to the target itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parse a path.
    pub fn parse(path: &str) -> Result<Self, Error> {
        let mut segments = Vec::new();
        let mut rest = path.trim();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| Error::binding(format!("unclosed '[' in path '{}'", path)))?;
                let index = after[..end].trim().parse::<usize>().map_err(|_| {
                    Error::binding(format!("invalid index '{}' in path '{}'", &after[..end], path))
                })?;
                segments.push(PathSegment::Index(index));
                rest = &after[end + 1..];
            } else if let Some(after) = rest.strip_prefix('.') {
                if segments.is_empty() || after.starts_with(&['.', '['][..]) || after.is_empty() {
                    return Err(Error::binding(format!("malformed path '{}'", path)));
                }
                rest = after;
            } else {
                let end = rest.find(&['.', '['][..]).unwrap_or(rest.len());
                let name = &rest[..end];
                if name.contains(']') {
                    return Err(Error::binding(format!("malformed path '{}'", path)));
                }
                segments.push(PathSegment::Member(name.to_string()));
                rest = &rest[end..];
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// This path followed by `rest`.
    pub fn join(&self, rest: &PropertyPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(rest.segments.iter().cloned());
        Self { segments }
    }

    /// The remainder of this path below `prefix`, if it starts with it.
    pub fn strip_prefix(&self, prefix: &PropertyPath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Member(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Member(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Reads and writes members of objects.
pub trait PropertyAccessor: Send + Sync {
    /// Read the value at `path`.
    ///
    /// Reading a member that the object does not declare is a binding error,
    /// except on dictionary-like objects where it yields null.
    fn get(&self, target: &Value, path: &str) -> Result<Value, Error>;

    /// Mutable slot at `path`, creating intermediate objects and a null
    /// leaf as needed.
    fn get_mut<'v>(&self, target: &'v mut Value, path: &str) -> Result<&'v mut Value, Error>;

    /// Write `value` at `path`, creating intermediate objects as needed.
    fn set(&self, target: &mut Value, path: &str, value: Value) -> Result<(), Error> {
        *self.get_mut(target, path)? = value;
        Ok(())
    }

    /// Whether `path` resolves to a declared member.
    fn has_property(&self, target: &Value, path: &str) -> bool;
}

/// Default accessor over [`Value`] graphs.
///
/// A member path applied to a scalar root yields the scalar itself, so a
/// statement taking a primitive parameter can refer to it by any name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectAccessor;

impl ObjectAccessor {
    pub fn new() -> Self {
        Self
    }
}

impl PropertyAccessor for ObjectAccessor {
    fn get(&self, target: &Value, path: &str) -> Result<Value, Error> {
        let parsed = PropertyPath::parse(path)?;
        if target.is_scalar() && !target.is_null() {
            if let [PathSegment::Member(_)] = parsed.segments() {
                return Ok(target.clone());
            }
        }

        let mut current = target;
        for segment in parsed.segments() {
            match (segment, current) {
                (_, Value::Null) => return Ok(Value::Null),
                (PathSegment::Member(name), Value::Object(obj)) => match obj.get(name) {
                    Some(value) => current = value,
                    None if obj.is_map() => return Ok(Value::Null),
                    None => {
                        return Err(Error::binding(format!(
                            "no property '{}' on type '{}' (path '{}')",
                            name,
                            obj.type_name(),
                            path
                        )))
                    }
                },
                (PathSegment::Index(index), Value::List(items)) => match items.get(*index) {
                    Some(value) => current = value,
                    None => {
                        return Err(Error::binding(format!(
                            "index {} out of range for list of {} (path '{}')",
                            index,
                            items.len(),
                            path
                        )))
                    }
                },
                (segment, value) => {
                    return Err(Error::binding(format!(
                        "cannot apply {:?} to a {} value (path '{}')",
                        segment,
                        value.type_name(),
                        path
                    )))
                }
            }
        }
        Ok(current.clone())
    }

    fn get_mut<'v>(&self, target: &'v mut Value, path: &str) -> Result<&'v mut Value, Error> {
        let parsed = PropertyPath::parse(path)?;
        let mut current = target;
        for segment in parsed.segments() {
            if current.is_null() {
                *current = match segment {
                    PathSegment::Member(_) => Value::Object(Object::map()),
                    PathSegment::Index(_) => Value::List(Vec::new()),
                };
            }
            current = match (segment, current) {
                (PathSegment::Member(name), Value::Object(obj)) => {
                    obj.get_or_insert_with(name, || Value::Null)
                }
                (PathSegment::Index(index), Value::List(items)) => {
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
                (segment, other) => {
                    return Err(Error::binding(format!(
                        "cannot set {:?} on a {} value (path '{}')",
                        segment,
                        other.type_name(),
                        path
                    )))
                }
            };
        }
        Ok(current)
    }

    fn has_property(&self, target: &Value, path: &str) -> bool {
        let Ok(parsed) = PropertyPath::parse(path) else {
            return false;
        };
        let mut current = target;
        for segment in parsed.segments() {
            current = match (segment, current) {
                (PathSegment::Member(name), Value::Object(obj)) => match obj.get(name) {
                    Some(value) => value,
                    None => return false,
                },
                (PathSegment::Index(index), Value::List(items)) => match items.get(*index) {
                    Some(value) => value,
                    None => return false,
                },
                _ => return false,
            };
        }
        true
    }
}
