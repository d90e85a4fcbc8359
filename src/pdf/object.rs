//! PDF object types and serialization

use std::fmt;

use super::{Dictionary, Stream};

/// Identifier of an indirect object: object number plus generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    /// Object number
    pub number: u32,
    /// Generation number
    pub generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.generation)
    }
}

/// PDF object types
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real value
    Real(f64),
    /// String value, literal and hexadecimal forms both decode to bytes
    String(Vec<u8>),
    /// Name object, `#xx` escapes already decoded
    Name(Vec<u8>),
    /// Array object
    Array(Vec<Object>),
    /// Dictionary object
    Dictionary(Dictionary),
    /// Stream object
    Stream(Stream),
    /// Indirect reference
    Reference(ObjectId),
}

impl Object {
    /// Create a name object
    pub fn name(name: &str) -> Self {
        Object::Name(name.as_bytes().to_vec())
    }

    /// Create a string object
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(bytes.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Collect every indirect reference held anywhere inside this object
    pub fn collect_references(&self, out: &mut Vec<ObjectId>) {
        match self {
            Object::Reference(id) => out.push(*id),
            Object::Array(items) => items.iter().for_each(|item| item.collect_references(out)),
            Object::Dictionary(dict) => dict.values().for_each(|v| v.collect_references(out)),
            Object::Stream(stream) => stream.dict.values().for_each(|v| v.collect_references(out)),
            _ => {}
        }
    }

    /// Serialize object in PDF syntax
    pub fn write_to(&self, output: &mut Vec<u8>) {
        match self {
            Object::Null => output.extend_from_slice(b"null"),
            Object::Boolean(b) => output.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => output.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(*r, output),
            Object::String(s) => write_string(s, output),
            Object::Name(n) => write_name(n, output),
            Object::Array(items) => {
                output.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        output.push(b' ');
                    }
                    item.write_to(output);
                }
                output.push(b']');
            }
            Object::Dictionary(d) => d.write_to(output),
            Object::Stream(s) => s.write_to(output),
            Object::Reference(id) => {
                output.extend_from_slice(format!("{} {} R", id.number, id.generation).as_bytes())
            }
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<Stream> for Object {
    fn from(stream: Stream) -> Self {
        Object::Stream(stream)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

fn write_real(value: f64, output: &mut Vec<u8>) {
    if !value.is_finite() {
        output.push(b'0');
        return;
    }
    let text = format!("{}", value);
    output.extend_from_slice(text.as_bytes());
}

/// Printable strings go out as literals, anything else as hex
fn write_string(bytes: &[u8], output: &mut Vec<u8>) {
    let printable = bytes
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) || b == b'\n' || b == b'\r' || b == b'\t');

    if !printable {
        output.push(b'<');
        output.extend_from_slice(hex::encode_upper(bytes).as_bytes());
        output.push(b'>');
        return;
    }

    output.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                output.push(b'\\');
                output.push(b);
            }
            b'\n' => output.extend_from_slice(b"\\n"),
            b'\r' => output.extend_from_slice(b"\\r"),
            b'\t' => output.extend_from_slice(b"\\t"),
            _ => output.push(b),
        }
    }
    output.push(b')');
}

pub(crate) fn write_name(name: &[u8], output: &mut Vec<u8>) {
    output.push(b'/');
    for &b in name {
        let regular = (0x21..=0x7E).contains(&b) && !b"()<>[]{}/%#".contains(&b);
        if regular {
            output.push(b);
        } else {
            output.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}
