//! Decoded texture pixels.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::error::TextureError;

/// An RGBA8 texture ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureData {
    /// Wraps raw RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions {
                width,
                height,
                reason: "zero-sized texture".to_string(),
            });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(TextureError::InvalidDimensions {
                width,
                height,
                reason: format!("expected {} bytes, got {}", expected, pixels.len()),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A texture filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, TextureError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::from_rgba(width, height, pixels)
    }

    /// Decodes an encoded image (PNG, JPEG, DDS, ...) to RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        if bytes.is_empty() {
            return Err(TextureError::Empty);
        }
        let image = image::load_from_memory(bytes)?;
        Self::from_image(image.to_rgba8())
    }

    pub fn from_image(image: RgbaImage) -> Result<Self, TextureError> {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// Encodes as PNG, the format used for locally generated tiles.
    pub fn encode_png(&self) -> Result<Vec<u8>, TextureError> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| TextureError::InvalidDimensions {
                width: self.width,
                height: self.height,
                reason: "pixel buffer does not match dimensions".to_string(),
            })?;
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(TextureError::from)?;
        Ok(out.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Memory footprint used for cache accounting.
    pub fn size_in_bytes(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for TextureData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_texture() {
        let tex = TextureData::solid(4, 2, [10, 20, 30, 255]).unwrap();
        assert_eq!(tex.size_in_bytes(), 32);
        assert_eq!(&tex.pixels()[4..8], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let result = TextureData::from_rgba(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(TextureError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_png_roundtrip() {
        let tex = TextureData::solid(8, 8, [200, 100, 50, 255]).unwrap();
        let png = tex.encode_png().unwrap();
        let decoded = TextureData::decode(&png).unwrap();
        assert_eq!(decoded, tex);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(TextureData::decode(b"<html>not found</html>").is_err());
        assert_eq!(TextureData::decode(&[]), Err(TextureError::Empty));
    }
}
