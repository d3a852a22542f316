/// Shared data structures for a download
///
/// These structs represent the data model that flows between
/// the URL field, the image loader and photo storage.
use image::DynamicImage;

/// A validated request to fetch one image
///
/// Created when the Download button is pressed and dropped once the
/// fetch completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    url: String,
}

impl ImageRequest {
    /// Build a request from raw user input.
    /// Returns None when the input is empty after trimming.
    pub fn new(input: &str) -> Option<Self> {
        let url = input.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A decompressed, pixel-addressable image
///
/// Owned by the workflow for display and save, then released.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    inner: DynamicImage,
}

impl DecodedImage {
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    /// Decode an image from compressed bytes (format is guessed)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        image::load_from_memory(bytes).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// RGBA8 pixels in row-major order, for the display surface
    pub fn rgba_pixels(&self) -> Vec<u8> {
        self.inner.to_rgba8().into_raw()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_request_trims_input() {
        let request = ImageRequest::new("  https://example.com/cat.png \n").unwrap();
        assert_eq!(request.url(), "https://example.com/cat.png");
    }

    #[test]
    fn test_blank_request_is_rejected() {
        assert!(ImageRequest::new("").is_none());
        assert!(ImageRequest::new("   \t").is_none());
    }

    #[test]
    fn test_decode_png_bytes() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();

        let decoded = DecodedImage::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.rgba_pixels().len(), 3 * 2 * 4);
        assert_eq!(&decoded.rgba_pixels()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(DecodedImage::from_bytes(b"definitely not an image").is_err());
    }
}
