//! File-level sections: cross-reference table or stream, trailer and the
//! `startxref` footer.

use crate::{
    error::Result,
    pdf::{
        document::{dict_types, filters, K_FILTER, K_TYPE},
        stream::flate_encode,
        trailer::{Trailer, K_SIZE, TRAILER},
        xref::{Xref, XrefEntry},
        Dictionary, Name, Object, Stream,
    },
    simple_encode::object::{KeepReferences, ObjectEncoder},
    writer::Writer,
};

const XREF: &[u8] = b"xref";
const STARTXREF: &[u8] = b"startxref";
const EOF_MARKER: &[u8] = b"%%EOF";
const EOL: &[u8] = b"\r\n";
const K_W: &[u8] = b"W";

/// Write the classic cross-reference table with a single subsection.
///
/// Every entry is exactly 20 bytes long.
pub fn write_xref_table(xref: &Xref, writer: &mut dyn Writer) {
    log::trace!("write XRef table");

    writer.write(XREF);
    writer.write(EOL);
    writer.write(format!("0 {}", xref.len()).as_bytes());
    writer.write(EOL);

    for entry in xref.entries() {
        let line = match entry {
            XrefEntry::Free(free) => format!("{:010} {:05} f\r\n", free.next_free, free.generation),
            XrefEntry::Used(used) => format!("{:010} {:05} n\r\n", used.byte_offset, used.generation),
            XrefEntry::UsedCompressed(compressed) => {
                log::warn!(
                    "Object {} lives in an object stream, a table can't point to it",
                    compressed.number
                );
                format!("{:010} {:05} f\r\n", 0, crate::pdf::xref::FREE_GENERATION)
            }
        };
        writer.write(line.as_bytes());
    }
}

/// `trailer` followed by the trailer dictionary.
pub fn write_trailer(trailer: &Trailer, writer: &mut dyn Writer) -> Result<()> {
    log::trace!("write Trailer");

    let dict: Dictionary = trailer.clone().into();
    let mut buf = Vec::new();
    ObjectEncoder::new(&mut KeepReferences).encode_value(&Object::Dictionary(dict), &mut buf)?;

    writer.write(TRAILER);
    writer.write(EOL);
    writer.write(&buf);
    writer.write(EOL);
    Ok(())
}

pub fn write_startxref(start_xref: usize, writer: &mut dyn Writer) {
    writer.write(STARTXREF);
    writer.write(EOL);
    writer.write(start_xref.to_string().as_bytes());
    writer.write(EOL);
    writer.write(EOF_MARKER);
    writer.write(EOL);
}

/// Minimal number of bytes to hold `value`. Zero still takes one byte.
fn bytes_needed(value: u64) -> usize {
    let bits = u64::BITS - value.leading_zeros();
    (bits as usize).div_ceil(8).max(1)
}

fn entry_fields(entry: &XrefEntry) -> (u64, u64, u64) {
    let kind = u64::from(entry.type_num());
    match entry {
        XrefEntry::Free(e) => (kind, e.next_free.into(), e.generation.into()),
        XrefEntry::Used(e) => (kind, e.byte_offset as u64, e.generation.into()),
        XrefEntry::UsedCompressed(e) => (kind, e.containing_object.into(), e.index.into()),
    }
}

/// Big-endian, truncated to the lowest `width` bytes.
fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
    let bytes = value.to_be_bytes();
    data.extend_from_slice(&bytes[bytes.len() - width..]);
}

/// Build the cross-reference stream. The trailer entries are merged into its
/// dictionary; the stream itself is never encrypted.
pub fn xref_stream(xref: &Xref, trailer: Trailer) -> Result<Stream> {
    log::trace!("write XRef stream");

    let fields: Vec<_> = xref.entries().map(entry_fields).collect();
    let mut widths = [1usize, 1, 1];
    for (_, second, third) in fields.iter() {
        widths[1] = widths[1].max(bytes_needed(*second));
        widths[2] = widths[2].max(bytes_needed(*third));
    }

    let mut data = Vec::with_capacity(fields.len() * widths.iter().sum::<usize>());
    for (first, second, third) in fields {
        write_field(&mut data, first, widths[0]);
        write_field(&mut data, second, widths[1]);
        write_field(&mut data, third, widths[2]);
    }

    let mut dictionary: Dictionary = trailer.into();
    dictionary.insert(Name::from(K_TYPE), Name::from(dict_types::XREF).into());
    dictionary.insert(Name::from(K_SIZE), Object::from(xref.size()));
    dictionary.insert(
        Name::from(K_W),
        Object::from(widths.iter().map(|w| Object::Integer(*w as i64)).collect::<Vec<_>>()),
    );
    dictionary.insert(Name::from(K_FILTER), Name::from(filters::FLATE_DECODE).into());

    Ok(Stream::new(dictionary, flate_encode(&data)?))
}
