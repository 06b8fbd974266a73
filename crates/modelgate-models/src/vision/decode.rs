//! Upload checks and image decoding

use image::imageops::FilterType;
use image::RgbImage;
use modelgate_core::{Error, Result};

/// Content types accepted for classification
pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            content_type: Some(content_type.into()),
            bytes,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Reject anything outside the accepted set before any decoding happens
pub fn check_content_type(content_type: Option<&str>) -> Result<()> {
    let Some(raw) = content_type else {
        return Err(Error::unsupported_media("<none>"));
    };

    // Ignore parameters such as `; charset=binary`
    let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(Error::unsupported_media(raw))
    }
}

/// Decode to 8-bit RGB and resize to `size` x `size`
pub fn decode_rgb(bytes: &[u8], size: u32) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(Error::decode("empty upload"));
    }

    let img = image::load_from_memory(bytes).map_err(|e| Error::decode(e.to_string()))?;
    Ok(image::imageops::resize(&img.to_rgb8(), size, size, FilterType::CatmullRom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_content_types() {
        assert!(check_content_type(Some("image/png")).is_ok());
        assert!(check_content_type(Some("IMAGE/JPEG")).is_ok());
        assert!(check_content_type(Some("image/webp; q=1")).is_ok());

        for bad in [Some("image/gif"), Some("text/plain"), Some("application/pdf"), None] {
            assert!(matches!(check_content_type(bad), Err(Error::UnsupportedMedia(_))));
        }
    }

    #[test]
    fn test_decode_resizes() {
        let img = decode_rgb(&png(31, 17), 8).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        let px = img.get_pixel(4, 4);
        assert!(px[0] > 150 && px[1] < 60);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(decode_rgb(b"not an image", 8), Err(Error::Decode(_))));
        assert!(matches!(decode_rgb(&[], 8), Err(Error::Decode(_))));
    }
}
