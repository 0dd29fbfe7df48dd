use crate::error::{CbError, Result};

/// References to objects inside a PDF section.
///
/// References in this table mark object indices either as used or unused.
/// Used objects are divided into two groups compressed and uncompressed
/// objects. Uncompressed objects can be immediately accessed at the given byte
/// offset while compressed objects are contained inside an object stream.
///
/// Entries are kept sorted by object number without gaps, starting at object
/// 0 (the head of the free list).
#[derive(Debug, Clone, PartialEq)]
pub struct Xref(Vec<XrefEntry>);

/// Generation of free entries that may never be reused.
pub const FREE_GENERATION: u16 = 65535;

impl Xref {
    /// Sort `entries` by number and fill every gap, including object 0, with
    /// a free entry. Each number may appear only once.
    pub fn from_entries(mut entries: Vec<XrefEntry>) -> Result<Self> {
        entries.sort_by_key(XrefEntry::number);
        if let Some(pair) = entries.windows(2).find(|w| w[0].number() == w[1].number()) {
            return Err(CbError::DuplicateXrefEntry(pair[0].number()));
        }

        let mut filled = Vec::with_capacity(entries.len() + 1);
        let mut next = 0;
        for entry in entries {
            while next < entry.number() {
                filled.push(FreeObject::unused(next).into());
                next += 1;
            }
            next = entry.number() + 1;
            filled.push(entry);
        }
        if filled.is_empty() {
            filled.push(FreeObject::unused(0).into());
        }
        Ok(Xref(filled))
    }

    pub fn entries(&self) -> impl Iterator<Item = &XrefEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the trailer's `Size` entry.
    pub fn size(&self) -> u32 {
        self.0.last().map_or(1, |e| e.number() + 1)
    }

    pub fn used_objects(&self) -> impl Iterator<Item = &UsedObject> {
        self.0
            .iter()
            .filter_map(|entry| if let XrefEntry::Used(u) = entry { Some(u) } else { None })
    }

    pub fn free_objects(&self) -> impl Iterator<Item = &FreeObject> {
        self.0
            .iter()
            .filter_map(|entry| if let XrefEntry::Free(u) = entry { Some(u) } else { None })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeObject {
    /// Number of this object
    pub number: u32,
    /// Next generation number that should be used
    pub generation: u16,
    /// Next free object number
    pub next_free: u32,
}

impl FreeObject {
    fn unused(number: u32) -> Self {
        Self {
            number,
            generation: FREE_GENERATION,
            next_free: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsedObject {
    /// Number of this object
    pub number: u32,
    /// The position of this object in the pdf file in bytes, starting from the
    /// beginning of the PDF.
    pub byte_offset: usize,
    pub generation: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsedCompressedObject {
    /// Number of this object
    pub number: u32,
    /// The number of the stream object that contains this object
    pub containing_object: u32,
    /// Position of this object inside the containing stream
    pub index: u32,
}

/// Denotes a free object reference in a xref stream.
pub const XREF_FREE: u8 = 0;
/// Denotes a used object reference in a xref stream.
pub const XREF_USED: u8 = 1;
/// Denotes a used and compressed object reference in a xref stream.
pub const XREF_COMPRESSED: u8 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum XrefEntry {
    Free(FreeObject),
    Used(UsedObject),
    /// Object is stored in compressed stream
    UsedCompressed(UsedCompressedObject),
}

impl XrefEntry {
    pub fn type_num(&self) -> u8 {
        match self {
            XrefEntry::Free(_) => XREF_FREE,
            XrefEntry::Used(_) => XREF_USED,
            XrefEntry::UsedCompressed(_) => XREF_COMPRESSED,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            XrefEntry::Free(FreeObject { number, .. }) => *number,
            XrefEntry::Used(UsedObject { number, .. }) => *number,
            XrefEntry::UsedCompressed(UsedCompressedObject { number, .. }) => *number,
        }
    }
}

impl From<UsedCompressedObject> for XrefEntry {
    fn from(v: UsedCompressedObject) -> Self {
        Self::UsedCompressed(v)
    }
}

impl From<UsedObject> for XrefEntry {
    fn from(v: UsedObject) -> Self {
        Self::Used(v)
    }
}

impl From<FreeObject> for XrefEntry {
    fn from(v: FreeObject) -> Self {
        Self::Free(v)
    }
}
