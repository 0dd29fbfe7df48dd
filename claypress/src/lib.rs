//! Writes an in-memory PDF object graph to a file, either in the classic
//! layout with a cross-reference table or compressed with object streams and
//! a cross-reference stream.

use std::{fs::File, io::BufWriter, path::Path};

pub mod compress;
pub mod error;
pub mod options;
pub mod pdf;
pub mod pool;
pub mod security;
pub mod simple_encode;
pub mod writer;

pub use error::{CbError, Result};
pub use options::{CompressParameters, SaveOptions};
pub use pdf::{Document, Object, ObjectKey};
pub use writer::PdfWriter;

/// Write `document` to `path`, replacing the file if it exists.
///
/// The file is closed on every path. After an error its content is
/// incomplete and should be discarded.
pub fn save_to_file(document: &Document, path: &Path, options: SaveOptions) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let file = PdfWriter::new(file).with_options(options).write(document)?;
    file.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}

/// Write `document` into memory.
pub fn save_to_vec(document: &Document, options: SaveOptions) -> Result<Vec<u8>> {
    PdfWriter::new(Vec::new()).with_options(options).write(document)
}
