use std::{collections::BTreeMap, fmt::Display, ops::Deref};

pub use self::{
    array::Array,
    document::Document,
    indirect::ObjectKey,
    name::Name,
    stream::Stream,
    string::CbString,
};

pub mod array;
pub mod document;
pub mod indirect;
pub mod name;
pub mod stream;
pub mod string;
pub mod trailer;
pub mod xref;

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Name),
    String(CbString),
    HexString(Bytes),
    Array(Array),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectKey),
}

impl Object {
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Dictionaries, arrays and streams. Everything else is a leaf of the
    /// object graph.
    pub fn is_composite(&self) -> bool {
        matches!(self, Object::Array(_) | Object::Dictionary(_) | Object::Stream(_))
    }

    pub fn integer(&self) -> Option<i64> {
        if let Object::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn name(&self) -> Option<&Name> {
        if let Object::Name(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn array(&self) -> Option<&Array> {
        if let Object::Array(a) = self {
            Some(a)
        } else {
            None
        }
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        if let Object::Dictionary(d) = self {
            Some(d)
        } else {
            None
        }
    }

    pub fn stream(&self) -> Option<&Stream> {
        if let Object::Stream(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn reference(&self) -> Option<ObjectKey> {
        if let Object::Reference(r) = self {
            Some(*r)
        } else {
            None
        }
    }

    pub fn hex_string(&self) -> Option<&Bytes> {
        if let Object::HexString(h) = self {
            Some(h)
        } else {
            None
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::Null
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Null => write!(f, "NULL"),
            Object::Bool(obj) => obj.fmt(f),
            Object::Integer(obj) => obj.fmt(f),
            Object::Real(obj) => obj.fmt(f),
            Object::Name(obj) => write!(f, "/{}", obj),
            Object::String(obj) => obj.fmt(f),
            Object::HexString(obj) => obj.fmt(f),
            Object::Array(obj) => obj.fmt(f),
            Object::Dictionary(obj) => write!(f, "Dictionary {{ {} entries }}", obj.len()),
            Object::Stream(obj) => write!(f, "Stream {{ {} bytes }}", obj.data.len()),
            Object::Reference(obj) => obj.fmt(f),
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Object {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for Object {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f32> for Object {
    fn from(v: f32) -> Self {
        Self::Real(v)
    }
}

impl From<CbString> for Object {
    fn from(v: CbString) -> Self {
        Self::String(v)
    }
}

impl From<Name> for Object {
    fn from(n: Name) -> Self {
        Self::Name(n)
    }
}

impl From<Vec<Object>> for Object {
    fn from(a: Vec<Object>) -> Self {
        Self::Array(a.into())
    }
}

impl From<Array> for Object {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Self::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Self::Stream(s)
    }
}

impl From<ObjectKey> for Object {
    fn from(k: ObjectKey) -> Self {
        Self::Reference(k)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let limited_length = self.len().min(15);
        write!(f, "{}", &String::from_utf8_lossy(&self.0[..limited_length]))
    }
}

/// Dictionaries keep their entries sorted by key so that the same graph
/// always produces the same bytes.
pub type Dictionary = BTreeMap<Name, Object>;

/// Build a dictionary from `(key, value)` pairs with string keys.
pub fn dictionary<I, O>(entries: I) -> Dictionary
where
    I: IntoIterator<Item = (&'static str, O)>,
    O: Into<Object>,
{
    entries
        .into_iter()
        .map(|(k, v)| (Name::from_str(k), v.into()))
        .collect()
}
