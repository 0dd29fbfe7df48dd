use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use super::{
    document::{dict_types, filters, K_DECODE_PARMS, K_FILTER, K_TYPE},
    Bytes, Dictionary, Name, Object,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stream {
    pub dictionary: Dictionary,
    /// Payload as stored in the file, i.e. with all filters applied.
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A filter other than `FlateDecode` or filter parameters are in use.
    Unsupported,
    InvalidData,
}

impl Stream {
    pub fn new(dictionary: Dictionary, data: Vec<u8>) -> Self {
        Self {
            dictionary,
            data: data.into(),
        }
    }

    /// Names of all filters in order of application. An unknown filter value
    /// yields `None`.
    pub fn filters(&self) -> Option<Vec<&Name>> {
        match self.dictionary.get(K_FILTER) {
            None | Some(Object::Null) => Some(Vec::new()),
            Some(Object::Name(n)) => Some(vec![n]),
            Some(Object::Array(a)) => a.iter().map(Object::name).collect(),
            Some(_) => None,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters().map_or(false, |f| f.is_empty())
    }

    pub fn type_name(&self) -> Option<&Name> {
        self.dictionary.get(K_TYPE).and_then(Object::name)
    }

    pub fn is_object_stream(&self) -> bool {
        self.type_name().map_or(false, |t| &t[..] == dict_types::OBJECT_STREAM)
    }

    pub fn is_xref_stream(&self) -> bool {
        self.type_name().map_or(false, |t| &t[..] == dict_types::XREF)
    }

    /// Payload with all filters removed. Only unfiltered and plain
    /// `FlateDecode` streams without parameters can be decoded.
    pub fn decoded_data(&self) -> Result<Vec<u8>, FilterError> {
        let applied = self.filters().ok_or(FilterError::Unsupported)?;
        let has_params = self
            .dictionary
            .get(K_DECODE_PARMS)
            .map_or(false, |p| !p.is_null());
        match &applied[..] {
            [] => Ok(self.data.to_vec()),
            [f] if &f[..] == filters::FLATE_DECODE && !has_params => flate_decode(&self.data),
            _ => Err(FilterError::Unsupported),
        }
    }
}

pub fn flate_encode(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| FilterError::InvalidData)?;
    Ok(out)
}
