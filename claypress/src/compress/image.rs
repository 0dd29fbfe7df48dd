//! Lossy recompression of raw image XObjects as baseline JPEG.

use ::image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageEncoder};

use crate::pdf::{
    document::{dict_types, filters, K_DECODE_PARMS, K_FILTER, K_LENGTH, K_SUBTYPE},
    Dictionary, Document, Name, Object, Stream,
};

use super::{
    compressor::{CompressError, Compressor},
    traversal::TraversedNode,
};

const K_WIDTH: &[u8] = b"Width";
const K_HEIGHT: &[u8] = b"Height";
const K_BITS_PER_COMPONENT: &[u8] = b"BitsPerComponent";
const K_COLOR_SPACE: &[u8] = b"ColorSpace";

/// Entries whose meaning a JPEG replacement can't carry.
const UNSUPPORTED_KEYS: [&[u8]; 6] = [
    b"SMask",
    b"Mask",
    b"Interpolate",
    b"Decode",
    b"ImageMask",
    K_DECODE_PARMS,
];

pub struct ImageCompressor {
    quality: u8,
}

impl ImageCompressor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    fn color_type(dict: &Dictionary) -> Option<(ExtendedColorType, usize)> {
        match dict.get(K_COLOR_SPACE).and_then(Object::name).map(|n| &n[..]) {
            Some(b"DeviceRGB") => Some((ExtendedColorType::Rgb8, 3)),
            Some(b"DeviceGray") => Some((ExtendedColorType::L8, 1)),
            _ => None,
        }
    }

    fn dimensions(dict: &Dictionary) -> Option<(u32, u32)> {
        let width = dict.get(K_WIDTH).and_then(Object::integer)?;
        let height = dict.get(K_HEIGHT).and_then(Object::integer)?;
        let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(height).ok().filter(|h| *h > 0)?;
        Some((width, height))
    }
}

impl Compressor for ImageCompressor {
    fn is_compressible(&self, object: &Object, _position: &TraversedNode) -> bool {
        let Some(stream) = object.stream() else {
            return false;
        };
        let dict = &stream.dictionary;

        let is_image = dict
            .get(K_SUBTYPE)
            .and_then(Object::name)
            .map_or(false, |n| &n[..] == dict_types::IMAGE);
        let plain_filters = stream.filters().map_or(false, |f| match &f[..] {
            [] => true,
            [single] => &single[..] == filters::FLATE_DECODE,
            _ => false,
        });

        is_image
            && plain_filters
            && UNSUPPORTED_KEYS.iter().all(|k| dict.get(*k).map_or(true, Object::is_null))
            && dict.get(K_BITS_PER_COMPONENT).and_then(Object::integer) == Some(8)
            && Self::color_type(dict).is_some()
            && Self::dimensions(dict).is_some()
    }

    fn compress(
        &self,
        _document: &Document,
        object: &Object,
        _position: &TraversedNode,
    ) -> Result<Object, CompressError> {
        let stream = object.stream().ok_or(CompressError::NotAStream)?;
        let dict = &stream.dictionary;
        let (color_type, components) = Self::color_type(dict).ok_or(CompressError::NotAStream)?;
        let (width, height) = Self::dimensions(dict).ok_or(CompressError::NotAStream)?;

        let samples = stream.decoded_data()?;
        let expected = width as usize * height as usize * components;
        if samples.len() != expected {
            return Err(CompressError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality.max(1))
            .write_image(&samples, width, height, color_type)?;
        if encoded.len() >= stream.data.len() {
            return Err(CompressError::NoGain);
        }

        let mut dictionary = dict.clone();
        dictionary.insert(Name::from(K_FILTER), Name::from(filters::DCT_DECODE).into());
        dictionary.remove(K_LENGTH);
        Ok(Stream::new(dictionary, encoded).into())
    }
}
