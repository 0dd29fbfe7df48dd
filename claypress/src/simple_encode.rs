//! Exact byte representation of PDF objects.
//!
//! Leaves (numbers, names, strings) are encoded by [`SimpleEncoder`] without
//! any context. Composite objects need to know how references resolve and
//! whether strings get encrypted, see [`object::ObjectEncoder`].

use crate::{
    pdf::{Bytes, ObjectKey},
    writer::{Encoder, Writer},
};

pub mod name;
pub mod object;
pub mod section;
pub mod string;

pub(crate) const TRUE_OBJECT: &str = "true";
pub(crate) const FALSE_OBJECT: &str = "false";
pub(crate) const NULL_OBJECT: &str = "null";

pub struct SimpleEncoder;

impl Encoder<bool> for SimpleEncoder {
    fn write_to(b: &bool, writer: &mut dyn Writer) {
        if *b {
            writer.write(TRUE_OBJECT.as_bytes())
        } else {
            writer.write(FALSE_OBJECT.as_bytes())
        }
    }
}

impl Encoder<i64> for SimpleEncoder {
    fn write_to(i: &i64, writer: &mut dyn Writer) {
        writer.write(i.to_string().as_bytes())
    }
}

impl Encoder<f32> for SimpleEncoder {
    /// Plain decimal notation, PDF has no exponents.
    fn write_to(f: &f32, writer: &mut dyn Writer) {
        if f.is_finite() {
            // `Display` for floats never uses an exponent
            writer.write(f.to_string().as_bytes())
        } else {
            log::warn!("Non-finite real {} written as 0", f);
            writer.write(b"0")
        }
    }
}

impl Encoder<Bytes> for SimpleEncoder {
    fn write_to(bytes: &Bytes, writer: &mut dyn Writer) {
        writer.write(b"<");
        writer.write(hex::encode_upper(&bytes[..]).as_bytes());
        writer.write(b">");
    }
}

impl Encoder<ObjectKey> for SimpleEncoder {
    fn write_to(key: &ObjectKey, writer: &mut dyn Writer) {
        writer.write(key.number.to_string().as_bytes());
        writer.write(b" ");
        writer.write(key.generation.to_string().as_bytes());
        writer.write(b" R");
    }
}
