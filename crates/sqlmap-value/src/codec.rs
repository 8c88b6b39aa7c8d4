//! Canonical byte encoding of values.
//!
//! Two values encode to the same bytes exactly when they are structurally
//! identical (floats compare by bit pattern). The encoding is only used for
//! fingerprinting and is never decoded.

use crate::object::Object;
use crate::value::Value;

/// Type tag for encoded values.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueTag {
    Null = 0,
    Bool = 1,
    Int32 = 2,
    Int64 = 3,
    Float32 = 4,
    Float64 = 5,
    String = 6,
    Bytes = 7,
    Timestamp = 8,
    List = 9,
    Object = 10,
    Deferred = 11,
}

impl Value {
    /// Encode this value canonically.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_canonical(&mut buf);
        buf
    }

    /// Append the canonical encoding of this value to `buf`.
    ///
    /// Format: one tag byte, then the payload. Variable-length payloads are
    /// prefixed with their length (4 bytes, little-endian).
    pub fn write_canonical(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => buf.push(ValueTag::Null as u8),
            Value::Bool(b) => {
                buf.push(ValueTag::Bool as u8);
                buf.push(*b as u8);
            }
            Value::Int32(i) => {
                buf.push(ValueTag::Int32 as u8);
                buf.extend_from_slice(&i.to_le_bytes());
            }
            Value::Int64(i) => {
                buf.push(ValueTag::Int64 as u8);
                buf.extend_from_slice(&i.to_le_bytes());
            }
            Value::Float32(f) => {
                buf.push(ValueTag::Float32 as u8);
                buf.extend_from_slice(&f.to_bits().to_le_bytes());
            }
            Value::Float64(f) => {
                buf.push(ValueTag::Float64 as u8);
                buf.extend_from_slice(&f.to_bits().to_le_bytes());
            }
            Value::String(s) => {
                buf.push(ValueTag::String as u8);
                write_bytes(buf, s.as_bytes());
            }
            Value::Bytes(b) => {
                buf.push(ValueTag::Bytes as u8);
                write_bytes(buf, b);
            }
            Value::Timestamp(t) => {
                buf.push(ValueTag::Timestamp as u8);
                buf.extend_from_slice(&t.to_le_bytes());
            }
            Value::List(items) => {
                buf.push(ValueTag::List as u8);
                write_len(buf, items.len());
                for item in items {
                    item.write_canonical(buf);
                }
            }
            Value::Object(obj) => {
                buf.push(ValueTag::Object as u8);
                write_object(buf, obj);
            }
            Value::Deferred(d) => {
                buf.push(ValueTag::Deferred as u8);
                write_bytes(buf, d.statement.as_bytes());
                buf.push(d.many as u8);
                d.parameter.write_canonical(buf);
            }
        }
    }
}

fn write_object(buf: &mut Vec<u8>, obj: &Object) {
    write_bytes(buf, obj.type_name().as_bytes());
    write_len(buf, obj.len());
    for (name, value) in obj.members() {
        write_bytes(buf, name.as_bytes());
        value.write_canonical(buf);
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u32).to_le_bytes());
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_len(buf, bytes.len());
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_types_encode_differently() {
        assert_ne!(
            Value::Int32(1).canonical_bytes(),
            Value::Int64(1).canonical_bytes()
        );
        assert_ne!(
            Value::String("1".into()).canonical_bytes(),
            Value::Int32(1).canonical_bytes()
        );
    }

    #[test]
    fn test_length_prefix_prevents_ambiguity() {
        let a = Value::list(["ab", "c"]);
        let b = Value::list(["a", "bc"]);
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_objects_encode_type_and_members() {
        let a = Value::from(Object::new("A").with("x", 1i32));
        let b = Value::from(Object::new("B").with("x", 1i32));
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
        assert_eq!(a.canonical_bytes(), a.clone().canonical_bytes());
    }
}
