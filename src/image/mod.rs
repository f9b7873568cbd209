//! Images referenced from reports.
//!
//! Export surfaces embed images as PNG data URIs so the SVG is self
//! contained. Anything that cannot be loaded is drawn as an alt-text
//! placeholder by the caller.

mod loader;

pub use loader::{ImageCache, ImageLoader};

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// An image ready to be placed on an export surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    /// Encode `image` as a PNG data URI.
    pub fn encode(image: &DynamicImage) -> Option<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        let mut png = Vec::new();
        if let Err(err) = image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
            tracing::debug!(%err, "png encode failed");
            return None;
        }
        Some(Self {
            data_uri: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
            width,
            height,
        })
    }

    /// Display size when scaled down to fit `max_width`. Never scales up.
    pub fn fit_width(&self, max_width: f32) -> (f32, f32) {
        let width = self.width as f32;
        let height = self.height as f32;
        if width <= max_width || width <= 0.0 {
            return (width, height);
        }
        let ratio = max_width / width;
        (max_width, height * ratio)
    }
}

/// Whether a markdown image url points somewhere the loader can read.
pub fn is_local(url: &str) -> bool {
    !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_encode_produces_png_data_uri() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
        let embedded = EmbeddedImage::encode(&img).expect("encoded");
        assert!(embedded.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!((embedded.width, embedded.height), (3, 2));
    }

    #[test]
    fn test_fit_width_scales_down_only() {
        let img = EmbeddedImage {
            data_uri: String::new(),
            width: 1600,
            height: 400,
        };
        assert_eq!(img.fit_width(800.0), (800.0, 200.0));
        assert_eq!(img.fit_width(2000.0), (1600.0, 400.0));
    }

    #[test]
    fn test_remote_urls_are_not_local() {
        assert!(is_local("charts/ridership.png"));
        assert!(!is_local("https://example.com/a.png"));
    }
}
