//! Page geometry and bitmap slicing.

use image::{Rgb, RgbImage, RgbaImage};

use crate::error::RasterError;

const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Physical page size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
}

impl PageFormat {
    /// A4 portrait with 10 mm margins.
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 10.0,
    };

    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height_mm(&self) -> f64 {
        self.height_mm - 2.0 * self.margin_mm
    }

    /// Pixel height of one page slice for a bitmap `bitmap_width` pixels
    /// wide, keeping the content area's aspect ratio.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn slice_height_px(&self, bitmap_width: u32) -> u32 {
        let height =
            f64::from(bitmap_width) * self.content_height_mm() / self.content_width_mm();
        (height.round() as u32).max(1)
    }

    /// Number of pages needed for a bitmap of the given size.
    pub fn page_count(&self, bitmap_width: u32, bitmap_height: u32) -> usize {
        bitmap_height.div_ceil(self.slice_height_px(bitmap_width)) as usize
    }

    pub fn width_pt(&self) -> f64 {
        self.width_mm * POINTS_PER_MM
    }

    pub fn height_pt(&self) -> f64 {
        self.height_mm * POINTS_PER_MM
    }

    pub fn margin_pt(&self) -> f64 {
        self.margin_mm * POINTS_PER_MM
    }

    pub fn content_width_pt(&self) -> f64 {
        self.content_width_mm() * POINTS_PER_MM
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::A4
    }
}

/// Slice a bitmap into consecutive page-height images.
///
/// Every page has the full slice height; the last one is padded with white
/// below the content. Transparent pixels are composited onto white.
pub fn paginate(bitmap: &RgbaImage, format: &PageFormat) -> Result<Vec<RgbImage>, RasterError> {
    let _scope = crate::perf::scope("export.paginate");
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(RasterError::EmptySurface { width, height });
    }

    let slice = format.slice_height_px(width);
    let count = format.page_count(width, height);
    let mut pages = Vec::with_capacity(count);

    for index in 0..count {
        // `index < count` and count * slice fits in u32 because height does.
        #[allow(clippy::cast_possible_truncation)]
        let top = index as u32 * slice;
        let rows = slice.min(height - top);
        let mut page = RgbImage::from_pixel(width, slice, Rgb([255, 255, 255]));
        for y in 0..rows {
            for x in 0..width {
                let src = bitmap.get_pixel(x, top + y);
                page.put_pixel(x, y, over_white(src.0));
            }
        }
        pages.push(page);
    }

    crate::perf::log_event(
        "export.paginate",
        format!("bitmap={width}x{height} slice={slice} pages={count}"),
    );
    Ok(pages)
}

fn over_white([r, g, b, a]: [u8; 4]) -> Rgb<u8> {
    if a == u8::MAX {
        return Rgb([r, g, b]);
    }
    let alpha = u16::from(a);
    let blend = |c: u8| {
        let value = (u16::from(c) * alpha + 255 * (255 - alpha)) / 255;
        u8::try_from(value).unwrap_or(u8::MAX)
    };
    Rgb([blend(r), blend(g), blend(b)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_a4_slice_height() {
        let format = PageFormat::A4;
        assert_eq!(format.slice_height_px(1900), 2770);
        assert_eq!(format.slice_height_px(1600), 2333);
    }

    #[test]
    fn test_two_point_four_pages_yield_three() {
        let format = PageFormat::A4;
        let bitmap = RgbaImage::from_pixel(1900, 6648, Rgba([0, 0, 0, 255]));
        let pages = paginate(&bitmap, &format).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.dimensions() == (1900, 2770)));
        // Last page: 0.4 of a page of content, then white.
        assert_eq!(pages[2].get_pixel(0, 1000).0, [0, 0, 0]);
        assert_eq!(pages[2].get_pixel(0, 1200).0, [255, 255, 255]);
    }

    #[test]
    fn test_exact_multiple_has_no_blank_page() {
        let format = PageFormat::A4;
        assert_eq!(format.page_count(1900, 2770 * 2), 2);
        assert_eq!(format.page_count(1900, 1), 1);
    }

    #[test]
    fn test_empty_bitmap_is_an_error() {
        let bitmap = RgbaImage::new(0, 0);
        assert!(paginate(&bitmap, &PageFormat::A4).is_err());
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        assert_eq!(over_white([0, 0, 0, 0]).0, [255, 255, 255]);
        assert_eq!(over_white([10, 20, 30, 255]).0, [10, 20, 30]);
    }
}
