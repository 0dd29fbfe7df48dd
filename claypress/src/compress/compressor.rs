use crate::pdf::{
    document::{dict_types, filters, K_DECODE_PARMS, K_FILTER, K_LENGTH},
    stream::{flate_encode, FilterError},
    Document, Name, Object, Stream,
};

use super::traversal::TraversedNode;

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    /// The replacement is not smaller than the original.
    #[error("replacement is not smaller")]
    NoGain,
    #[error("object is not a stream")]
    NotAStream,
    #[error("stream can't be decoded: {0:?}")]
    Filter(FilterError),
    #[error("decoded image has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("image encoding failed: {0}")]
    Image(#[from] ::image::ImageError),
    #[error("encoder failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FilterError> for CompressError {
    fn from(err: FilterError) -> Self {
        CompressError::Filter(err)
    }
}

/// Replaces the content of an object with a smaller equivalent.
///
/// `is_compressible` must only accept objects for which `compress` can build a
/// faithful replacement. `compress` keeps every dictionary entry it doesn't
/// recompute.
pub trait Compressor {
    fn is_compressible(&self, object: &Object, position: &TraversedNode) -> bool;

    fn compress(
        &self,
        document: &Document,
        object: &Object,
        position: &TraversedNode,
    ) -> Result<Object, CompressError>;
}

/// Flate encodes streams that are stored without a filter.
pub struct StreamCompressor;

impl StreamCompressor {
    fn is_excluded(stream: &Stream) -> bool {
        stream.is_object_stream()
            || stream.is_xref_stream()
            || stream
                .type_name()
                .map_or(false, |t| &t[..] == dict_types::METADATA)
    }
}

impl Compressor for StreamCompressor {
    fn is_compressible(&self, object: &Object, _position: &TraversedNode) -> bool {
        object.stream().map_or(false, |s| {
            !s.data.is_empty() && s.is_unfiltered() && !Self::is_excluded(s)
        })
    }

    fn compress(
        &self,
        _document: &Document,
        object: &Object,
        _position: &TraversedNode,
    ) -> Result<Object, CompressError> {
        let stream = object.stream().ok_or(CompressError::NotAStream)?;
        let encoded = flate_encode(&stream.data)?;
        if encoded.len() >= stream.data.len() {
            return Err(CompressError::NoGain);
        }

        let mut dictionary = stream.dictionary.clone();
        dictionary.insert(Name::from(K_FILTER), Name::from(filters::FLATE_DECODE).into());
        dictionary.remove(K_DECODE_PARMS);
        dictionary.remove(K_LENGTH);
        Ok(Stream::new(dictionary, encoded).into())
    }
}
