use super::{Bytes, Dictionary, Name, Object, ObjectKey};

pub const TRAILER: &[u8] = b"trailer";
pub const K_SIZE: &[u8] = b"Size";
pub const K_ENCRYPT: &[u8] = b"Encrypt";
pub const K_ROOT: &[u8] = b"Root";
pub const K_INFO: &[u8] = b"Info";
pub const K_ID: &[u8] = b"ID";

/// Trailer of a single-section file. There is never a `Prev` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    /// Highest object number used in the file plus one.
    pub size: u32,

    /// Reference to the catalog.
    pub root: ObjectKey,

    /// Reference to the encryption dictionary.
    pub encrypt: Option<ObjectKey>,

    /// Information for this document.
    pub info: Option<ObjectKey>,

    /// File identifier.
    pub id: [Bytes; 2],
}

impl From<Trailer> for Dictionary {
    fn from(trailer: Trailer) -> Self {
        let mut dict = Dictionary::new();
        dict.insert(Name::from(K_SIZE), Object::from(trailer.size));
        dict.insert(Name::from(K_ROOT), Object::Reference(trailer.root));

        if let Some(enc) = trailer.encrypt {
            dict.insert(Name::from(K_ENCRYPT), Object::Reference(enc));
        }

        if let Some(info) = trailer.info {
            dict.insert(Name::from(K_INFO), Object::Reference(info));
        }

        let [id0, id1] = trailer.id;
        dict.insert(
            Name::from(K_ID),
            Object::Array(vec![Object::HexString(id0), Object::HexString(id1)].into()),
        );

        dict
    }
}
