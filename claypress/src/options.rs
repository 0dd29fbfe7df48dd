/// Default number of objects packed into one object stream.
pub const DEFAULT_OBJECT_STREAM_SIZE: usize = 200;

/// Default JPEG quality for recompressed images.
pub const DEFAULT_IMAGE_QUALITY: u8 = 100;

/// Options for saving PDF documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
    /// Write object streams and a cross-reference stream. `None` writes the
    /// classic layout with a cross-reference table.
    pub compression: Option<CompressParameters>,
}

impl SaveOptions {
    /// Create a builder for SaveOptions
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::default()
    }

    /// Options with default compression.
    pub fn compressed() -> Self {
        Self {
            compression: Some(CompressParameters::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressParameters {
    object_stream_size: usize,
    compress_streams: bool,
    compress_images: bool,
    image_quality: u8,
}

impl Default for CompressParameters {
    fn default() -> Self {
        Self {
            object_stream_size: DEFAULT_OBJECT_STREAM_SIZE,
            compress_streams: true,
            compress_images: false,
            image_quality: DEFAULT_IMAGE_QUALITY,
        }
    }
}

impl CompressParameters {
    /// Maximum number of objects per object stream. Zero is rejected in favour
    /// of the default.
    pub fn with_object_stream_size(mut self, size: usize) -> Self {
        if size == 0 {
            log::warn!(
                "Object stream size must be positive, using {}",
                DEFAULT_OBJECT_STREAM_SIZE
            );
            self.object_stream_size = DEFAULT_OBJECT_STREAM_SIZE;
        } else {
            self.object_stream_size = size;
        }
        self
    }

    pub fn with_compress_streams(mut self, value: bool) -> Self {
        self.compress_streams = value;
        self
    }

    pub fn with_compress_images(mut self, value: bool) -> Self {
        self.compress_images = value;
        self
    }

    /// JPEG quality in percent, clamped to `0..=100`.
    pub fn with_image_quality(mut self, quality: i32) -> Self {
        // clamped right before the cast
        self.image_quality = quality.clamp(0, 100) as u8;
        self
    }

    pub fn object_stream_size(&self) -> usize {
        self.object_stream_size
    }

    pub fn compress_streams(&self) -> bool {
        self.compress_streams
    }

    pub fn compress_images(&self) -> bool {
        self.compress_images
    }

    pub fn image_quality(&self) -> u8 {
        self.image_quality
    }
}

/// Builder for SaveOptions
#[derive(Default)]
pub struct SaveOptionsBuilder {
    use_object_streams: bool,
    parameters: CompressParameters,
}

impl SaveOptionsBuilder {
    /// Enable or disable object streams and the cross-reference stream
    pub fn use_object_streams(mut self, value: bool) -> Self {
        self.use_object_streams = value;
        self
    }

    /// Set maximum objects per stream
    pub fn object_stream_size(mut self, value: usize) -> Self {
        self.parameters = self.parameters.with_object_stream_size(value);
        self
    }

    /// Flate encode streams that have no filter
    pub fn compress_streams(mut self, value: bool) -> Self {
        self.parameters = self.parameters.with_compress_streams(value);
        self
    }

    /// Re-encode suitable images as JPEG
    pub fn compress_images(mut self, value: bool) -> Self {
        self.parameters = self.parameters.with_compress_images(value);
        self
    }

    /// JPEG quality in percent
    pub fn image_quality(mut self, value: i32) -> Self {
        self.parameters = self.parameters.with_image_quality(value);
        self
    }

    /// Build the SaveOptions
    pub fn build(self) -> SaveOptions {
        SaveOptions {
            compression: self.use_object_streams.then_some(self.parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = CompressParameters::default();
        assert_eq!(params.object_stream_size(), 200);
        assert!(params.compress_streams());
        assert!(!params.compress_images());
        assert_eq!(params.image_quality(), 100);
        assert_eq!(SaveOptions::default().compression, None);
    }

    #[test]
    fn zero_object_stream_size_is_rejected() {
        let params = CompressParameters::default().with_object_stream_size(0);
        assert_eq!(params.object_stream_size(), DEFAULT_OBJECT_STREAM_SIZE);
        let params = params.with_object_stream_size(2);
        assert_eq!(params.object_stream_size(), 2);
    }

    #[test]
    fn image_quality_is_clamped() {
        assert_eq!(CompressParameters::default().with_image_quality(-5).image_quality(), 0);
        assert_eq!(CompressParameters::default().with_image_quality(250).image_quality(), 100);
        assert_eq!(CompressParameters::default().with_image_quality(42).image_quality(), 42);
    }

    #[test]
    fn builder() {
        let options = SaveOptions::builder()
            .use_object_streams(true)
            .object_stream_size(10)
            .compress_images(true)
            .image_quality(80)
            .build();
        let params = options.compression.expect("compression enabled");
        assert_eq!(params.object_stream_size(), 10);
        assert!(params.compress_images());
        assert_eq!(params.image_quality(), 80);

        let options = SaveOptions::builder().object_stream_size(10).build();
        assert_eq!(options.compression, None);
    }
}
