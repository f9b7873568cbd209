//! Surface rasterization.

use std::sync::{Arc, OnceLock};

use image::RgbaImage;
use resvg::usvg::fontdb::Database;

use super::surface::Surface;
use crate::error::RasterError;

/// Turns a laid-out surface into a bitmap.
pub trait Rasterizer {
    /// Rasterize `surface` at `scale` device pixels per layout unit.
    fn rasterize(&self, surface: &Surface, scale: f32) -> Result<RgbaImage, RasterError>;
}

/// System fonts, loaded once per process and shared read-only.
pub fn shared_fontdb() -> Arc<Database> {
    static FONTS: OnceLock<Arc<Database>> = OnceLock::new();
    Arc::clone(FONTS.get_or_init(|| {
        let _scope = crate::perf::scope("export.fontdb");
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system fonts");
        Arc::new(db)
    }))
}

/// Rasterizes with resvg against the shared font database.
#[derive(Debug, Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<Database>,
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self::with_fontdb(shared_fontdb())
    }

    pub const fn with_fontdb(fontdb: Arc<Database>) -> Self {
        Self { fontdb }
    }

    pub fn fontdb(&self) -> &Database {
        &self.fontdb
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, surface: &Surface, scale: f32) -> Result<RgbaImage, RasterError> {
        let _scope = crate::perf::scope("export.rasterize");
        if surface.is_empty() {
            return Err(empty(surface));
        }

        let opts = resvg::usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = resvg::usvg::Tree::from_str(surface.svg(), &opts)?;
        let size = tree.size();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = (size.width() * scale).ceil() as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let height = (size.height() * scale).ceil() as u32;
        if width == 0 || height == 0 {
            return Err(RasterError::EmptySurface { width, height });
        }

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or(RasterError::Pixmap { width, height })?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        // tiny-skia pixels are premultiplied.
        let straight: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();
        let bitmap = RgbaImage::from_raw(width, height, straight).ok_or(RasterError::Bitmap)?;
        crate::perf::log_event(
            "export.rasterize",
            format!("kind={:?} bitmap={width}x{height}", surface.kind()),
        );
        Ok(bitmap)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn empty(surface: &Surface) -> RasterError {
    RasterError::EmptySurface {
        width: surface.width().max(0.0) as u32,
        height: surface.height().max(0.0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::surface::{SurfaceKind, SvgWriter};

    fn rasterizer() -> ResvgRasterizer {
        ResvgRasterizer::with_fontdb(Arc::new(Database::new()))
    }

    #[test]
    fn test_rasterize_scales_bitmap() {
        let mut writer = SvgWriter::default();
        writer.rect(10.0, 10.0, 20.0, 20.0, "#000000");
        let surface = writer.finish(100.0, 50.0, "#ffffff", SurfaceKind::Rendered);
        let bitmap = rasterizer().rasterize(&surface, 2.0).unwrap();
        assert_eq!(bitmap.dimensions(), (200, 100));
        assert_eq!(bitmap.get_pixel(40, 40)[0], 0);
        assert_eq!(bitmap.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_empty_surface_is_an_error() {
        let surface = SvgWriter::default().finish(800.0, 0.0, "#ffffff", SurfaceKind::Rendered);
        assert!(matches!(
            rasterizer().rasterize(&surface, 2.0),
            Err(RasterError::EmptySurface { .. })
        ));
    }

    #[test]
    fn test_invalid_markup_is_an_error() {
        let surface = Surface::new("<svg".to_string(), 10.0, 10.0, SurfaceKind::Rendered);
        assert!(matches!(
            rasterizer().rasterize(&surface, 2.0),
            Err(RasterError::Svg(_))
        ));
    }
}
