use std::collections::BTreeMap;

use crate::pdf::{Bytes, Object, ObjectKey};

/// Dictionary type names
pub(crate) mod dict_types {
    pub const OBJECT_STREAM: &[u8] = b"ObjStm";
    pub const XREF: &[u8] = b"XRef";
    pub const METADATA: &[u8] = b"Metadata";
    pub const IMAGE: &[u8] = b"Image";
}

/// Filter names
pub(crate) mod filters {
    pub const FLATE_DECODE: &[u8] = b"FlateDecode";
    pub const DCT_DECODE: &[u8] = b"DCTDecode";
}

pub(crate) const K_TYPE: &[u8] = b"Type";
pub(crate) const K_SUBTYPE: &[u8] = b"Subtype";
pub(crate) const K_LENGTH: &[u8] = b"Length";
pub(crate) const K_FILTER: &[u8] = b"Filter";
pub(crate) const K_DECODE_PARMS: &[u8] = b"DecodeParms";
pub(crate) const K_STREAM_OBJECT_COUNT: &[u8] = b"N";
pub(crate) const K_FIRST: &[u8] = b"First";

/// Follow at most this many references in a chain before giving up.
const DEREF_LIMIT: usize = 128;

/// The object graph of one document, frozen for the duration of a write.
///
/// `root`, `info` and `encrypt` are usually references into `objects` but may
/// also be direct dictionaries that were never given an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub version: (u8, u8),
    pub objects: BTreeMap<ObjectKey, Object>,
    pub root: Object,
    pub info: Option<Object>,
    pub encrypt: Option<Object>,
    /// File identifier. Generated while writing when absent.
    pub id: Option<[Bytes; 2]>,
    /// Highest object number known to be in use, e.g. from the xref section
    /// of the file the document was read from.
    pub highest_object_number: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_version(1, 4)
    }

    pub fn with_version(major: u8, minor: u8) -> Self {
        Self {
            version: (major, minor),
            objects: BTreeMap::new(),
            root: Object::Null,
            info: None,
            encrypt: None,
            id: None,
            highest_object_number: 0,
        }
    }

    /// Store `object` under the next free object number.
    pub fn add_object<O: Into<Object>>(&mut self, object: O) -> ObjectKey {
        let start = self
            .highest_object_number
            .max(self.objects.keys().next_back().map_or(0, |k| k.number));
        let key = ObjectKey::new(start + 1, 0);
        self.insert_object(key, object);
        key
    }

    /// Store `object` under an explicit key, replacing what was there.
    pub fn insert_object<O: Into<Object>>(&mut self, key: ObjectKey, object: O) {
        self.highest_object_number = self.highest_object_number.max(key.number);
        self.objects.insert(key, object.into());
    }

    pub fn set_root<O: Into<Object>>(&mut self, root: O) {
        self.root = root.into();
    }

    pub fn set_info<O: Into<Object>>(&mut self, info: O) {
        self.info = Some(info.into());
    }

    pub fn set_encrypt<O: Into<Object>>(&mut self, encrypt: O) {
        self.encrypt = Some(encrypt.into());
    }

    pub fn get(&self, key: ObjectKey) -> Option<&Object> {
        self.objects.get(&key)
    }

    /// Follow a chain of references and return the key of the last
    /// reference together with the object it points to.
    ///
    /// Returns `None` for dangling references and for chains that are too
    /// long or cyclic.
    pub fn dereference(&self, start: ObjectKey) -> Option<(ObjectKey, &Object)> {
        let mut key = start;
        for _ in 0..DEREF_LIMIT {
            match self.objects.get(&key)? {
                Object::Reference(next) => key = *next,
                obj => return Some((key, obj)),
            }
        }
        log::warn!("Reference chain starting at {} is too long", start);
        None
    }
}
