use crate::{
    error::Result,
    pdf::{document::K_LENGTH, Array, Bytes, Dictionary, Name, Object, ObjectKey, Stream},
    security::SecurityHandler,
    simple_encode::{SimpleEncoder, NULL_OBJECT},
    writer::Encoder,
};

const START_STREAM: &[u8] = b"stream\r\n";
const END_STREAM: &[u8] = b"\r\nendstream";

/// Decides how references inside the encoded object are written.
pub trait ReferenceResolver {
    /// Key to write for `reference`. `None` marks a dangling reference, which
    /// is left out of dictionaries and written as `null` in arrays.
    fn resolve(&mut self, reference: ObjectKey) -> Result<Option<ObjectKey>>;

    /// Give a direct object that can't stay direct (a stream nested in
    /// another object) its own identity.
    fn promote(&mut self, object: &Object) -> Result<ObjectKey>;
}

/// Leaves every reference as it is. For graphs that were renumbered before.
pub struct KeepReferences;

impl ReferenceResolver for KeepReferences {
    fn resolve(&mut self, reference: ObjectKey) -> Result<Option<ObjectKey>> {
        Ok(Some(reference))
    }

    fn promote(&mut self, _object: &Object) -> Result<ObjectKey> {
        Err(crate::error::CbError::DirectStream)
    }
}

/// Encodes composite objects. Nested dictionaries and arrays are written
/// inline, references as `n g R`.
pub struct ObjectEncoder<'a, R: ?Sized> {
    resolver: &'a mut R,
    security: Option<&'a dyn SecurityHandler>,
    /// Indirect object currently encoded, feeds the encryption key.
    current: Option<ObjectKey>,
}

impl<'a, R: ReferenceResolver + ?Sized> ObjectEncoder<'a, R> {
    pub fn new(resolver: &'a mut R) -> Self {
        Self {
            resolver,
            security: None,
            current: None,
        }
    }

    /// Encrypt strings and stream payloads of the objects encoded from now on.
    pub fn with_encryption(mut self, handler: &'a dyn SecurityHandler) -> Self {
        self.security = Some(handler);
        self
    }

    /// `n g obj` header, the object, `endobj`.
    pub fn encode_indirect(&mut self, key: ObjectKey, obj: &Object, out: &mut Vec<u8>) -> Result<()> {
        self.current = Some(key);
        out.extend_from_slice(format!("{} {} obj\n", key.number, key.generation).as_bytes());
        self.encode_value(obj, out)?;
        out.extend_from_slice(b"\nendobj\n");
        self.current = None;
        Ok(())
    }

    /// The object's own value, without the indirect object wrapper. This is
    /// the form objects take inside object streams.
    pub fn encode_value(&mut self, obj: &Object, out: &mut Vec<u8>) -> Result<()> {
        match obj {
            Object::Null => out.extend_from_slice(NULL_OBJECT.as_bytes()),
            Object::Bool(b) => SimpleEncoder::write_to(b, out),
            Object::Integer(i) => SimpleEncoder::write_to(i, out),
            Object::Real(f) => SimpleEncoder::write_to(f, out),
            Object::Name(n) => SimpleEncoder::write_to(n, out),
            Object::String(s) => match self.encryption() {
                Some((handler, key)) => {
                    let encrypted = handler.encrypt_string(s, key)?;
                    SimpleEncoder::write_to(&Bytes::from(encrypted), out)
                }
                None => SimpleEncoder::write_to(s, out),
            },
            Object::HexString(h) => match self.encryption() {
                Some((handler, key)) => {
                    let encrypted = handler.encrypt_string(h, key)?;
                    SimpleEncoder::write_to(&Bytes::from(encrypted), out)
                }
                None => SimpleEncoder::write_to(h, out),
            },
            Object::Array(a) => self.encode_array(a, out)?,
            Object::Dictionary(d) => self.encode_dictionary(d, out)?,
            Object::Stream(s) => self.encode_stream(s, out)?,
            Object::Reference(r) => match self.resolver.resolve(*r)? {
                Some(key) => SimpleEncoder::write_to(&key, out),
                None => out.extend_from_slice(NULL_OBJECT.as_bytes()),
            },
        }
        Ok(())
    }

    fn encryption(&self) -> Option<(&'a dyn SecurityHandler, ObjectKey)> {
        self.security.zip(self.current)
    }

    /// Write a value nested in an array or dictionary. Returns `false` when
    /// nothing was written because the value is null or dangling.
    fn encode_nested(&mut self, obj: &Object, out: &mut Vec<u8>) -> Result<bool> {
        match obj {
            Object::Null => Ok(false),
            Object::Reference(r) => match self.resolver.resolve(*r)? {
                Some(key) => {
                    SimpleEncoder::write_to(&key, out);
                    Ok(true)
                }
                None => Ok(false),
            },
            Object::Stream(_) => {
                let key = self.resolver.promote(obj)?;
                SimpleEncoder::write_to(&key, out);
                Ok(true)
            }
            other => {
                self.encode_value(other, out)?;
                Ok(true)
            }
        }
    }

    fn encode_array(&mut self, array: &Array, out: &mut Vec<u8>) -> Result<()> {
        out.push(b'[');
        for (i, item) in array.iter().enumerate() {
            if i != 0 {
                out.push(b' ');
            }
            // positions matter in arrays, so missing values stay as null
            if !self.encode_nested(item, out)? {
                out.extend_from_slice(NULL_OBJECT.as_bytes());
            }
        }
        out.push(b']');
        Ok(())
    }

    fn encode_dictionary(&mut self, dict: &Dictionary, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(b"<<");
        let mut is_first = true;
        for (key, value) in dict.iter() {
            let rollback = out.len();
            if !is_first {
                out.push(b' ');
            }
            SimpleEncoder::write_to(key, out);
            out.push(b' ');
            if self.encode_nested(value, out)? {
                is_first = false;
            } else {
                out.truncate(rollback);
            }
        }
        out.extend_from_slice(b">>");
        Ok(())
    }

    fn encode_stream(&mut self, stream: &Stream, out: &mut Vec<u8>) -> Result<()> {
        let encrypted;
        let data: &[u8] = match self.encryption() {
            Some((handler, key)) => {
                encrypted = handler.encrypt_stream(&stream.data, key)?;
                &encrypted
            }
            None => &stream.data,
        };

        // update the dictionary to fit the payload that is actually written
        let mut dictionary = stream.dictionary.clone();
        dictionary.insert(Name::from(K_LENGTH), Object::Integer(data.len() as i64));
        self.encode_dictionary(&dictionary, out)?;
        out.push(b'\n');
        out.extend_from_slice(START_STREAM);
        out.extend_from_slice(data);
        out.extend_from_slice(END_STREAM);
        Ok(())
    }
}
