//! Error types for texture decoding.

use std::fmt;

/// Errors that can occur while turning image bytes into a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// Image dimensions are unusable.
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Decoding the image bytes failed.
    DecodeFailed(String),
    /// The bytes are not in a supported image format.
    UnsupportedFormat(String),
    /// No bytes to decode.
    Empty,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}×{}: {}", width, height, reason)
            }
            TextureError::DecodeFailed(msg) => write!(f, "Decoding failed: {}", msg),
            TextureError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            TextureError::Empty => write!(f, "Empty image data"),
        }
    }
}

impl std::error::Error for TextureError {}

impl From<image::ImageError> for TextureError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => TextureError::UnsupportedFormat(e.to_string()),
            other => TextureError::DecodeFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_error_display_invalid_dimensions() {
        let err = TextureError::InvalidDimensions {
            width: 100,
            height: 0,
            reason: "zero height".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid dimensions 100×0: zero height");
    }

    #[test]
    fn test_texture_error_display_decode_failed() {
        let err = TextureError::DecodeFailed("truncated".to_string());
        assert_eq!(err.to_string(), "Decoding failed: truncated");
    }

    #[test]
    fn test_texture_error_display_empty() {
        assert_eq!(TextureError::Empty.to_string(), "Empty image data");
    }

    #[test]
    fn test_texture_error_from_image_error() {
        let err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let tex_err: TextureError = err.into();
        assert!(matches!(
            tex_err,
            TextureError::UnsupportedFormat(_) | TextureError::DecodeFailed(_)
        ));
    }
}
