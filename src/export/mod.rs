//! Paginated PDF export.
//!
//! A document is laid out onto an SVG surface, rasterized at 2x, sliced into
//! A4 pages and written as an image-per-page PDF. If layout or rasterization
//! fails, the markdown source is re-rendered with the minimal renderer and
//! exported the same way. Documents without source are written back to
//! markdown from their elements first.

mod fallback;
mod layout;
mod metrics;
mod paginate;
mod pdf;
mod raster;
mod surface;

pub use fallback::{fallback_surface, simple_html};
pub use layout::{SURFACE_WIDTH, layout};
pub use metrics::TextMeasure;
pub use paginate::{PageFormat, paginate};
pub use pdf::{PdfInfo, write_pdf};
pub use raster::{Rasterizer, ResvgRasterizer, shared_fontdb};
pub use surface::{Surface, SurfaceKind};

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tempfile::NamedTempFile;

use crate::error::{ExportError, RasterError};
use crate::image::ImageLoader;
use crate::render::{Profile, RenderOptions, RenderedDocument, render_markdown};

/// Device pixels per layout unit.
pub const EXPORT_SCALE: f32 = 2.0;

/// What to export.
#[derive(Debug, Clone, Copy)]
pub enum ExportInput<'a> {
    /// Markdown text, rendered with the print profile
    Markdown(&'a str),
    /// An already rendered document, exported as-is
    Document(&'a RenderedDocument),
}

/// A finished PDF.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Whether the minimal renderer produced the pages
    pub used_fallback: bool,
}

/// Exports reports to PDF.
pub struct Exporter {
    rasterizer: Box<dyn Rasterizer + Send + Sync>,
    measure: TextMeasure,
    images: ImageLoader,
    options: RenderOptions,
    format: PageFormat,
    scale: f32,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("format", &self.format)
            .field("scale", &self.scale)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Exporter using resvg and the system fonts.
    pub fn new() -> Self {
        let rasterizer = ResvgRasterizer::new();
        let measure = TextMeasure::from_fontdb(rasterizer.fontdb());
        Self {
            rasterizer: Box::new(rasterizer),
            measure,
            images: ImageLoader::default(),
            options: RenderOptions::default(),
            format: PageFormat::A4,
            scale: EXPORT_SCALE,
        }
    }

    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + Send + Sync + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    #[must_use]
    pub fn with_measure(mut self, measure: TextMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Resolve relative image paths against `images`' base directory.
    #[must_use]
    pub fn with_images(mut self, images: ImageLoader) -> Self {
        self.images = images;
        self
    }

    /// Options used when the input is markdown.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn with_format(mut self, format: PageFormat) -> Self {
        self.format = format;
        self
    }

    /// Write `<destination_name>.pdf` into `destination_dir`.
    ///
    /// The file appears only once it is complete; on failure nothing is left
    /// at the destination.
    pub fn export(
        &self,
        input: ExportInput<'_>,
        destination_dir: &Path,
        destination_name: &str,
    ) -> Result<PathBuf, ExportError> {
        let artifact = self.export_to_artifact(input)?;
        let path = destination_dir.join(format!("{destination_name}.pdf"));
        let write_err = |source| ExportError::Write {
            path: path.display().to_string(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(destination_dir).map_err(write_err)?;
        tmp.write_all(&artifact.bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|err| write_err(err.error))?;

        tracing::info!(
            path = %path.display(),
            pages = artifact.pages,
            fallback = artifact.used_fallback,
            "exported report"
        );
        Ok(path)
    }

    /// Produce the PDF bytes without touching the filesystem.
    pub fn export_to_artifact(&self, input: ExportInput<'_>) -> Result<ExportArtifact, ExportError> {
        let _scope = crate::perf::scope("export");
        let document = match input {
            ExportInput::Markdown(source) => {
                Cow::Owned(render_markdown(source, Profile::Print, &self.options))
            }
            ExportInput::Document(document) => Cow::Borrowed(document),
        };

        let (pages, used_fallback) = match self.primary(&document) {
            Ok(pages) => (pages, false),
            Err(primary) => {
                tracing::warn!(error = %primary, "primary export failed, using minimal renderer");
                crate::perf::log_event("export.fallback", primary.to_string());
                let source = match document.source() {
                    Some(source) => Cow::Borrowed(source),
                    None => Cow::Owned(fallback::document_markdown(&document)),
                };
                match self.fallback(&source) {
                    Ok(pages) => (pages, true),
                    Err(fallback) => {
                        tracing::error!(%primary, %fallback, "both export paths failed");
                        return Err(ExportError::Exhausted { primary, fallback });
                    }
                }
            }
        };

        let title = document
            .frame()
            .map_or_else(|| self.options.title.clone(), |frame| frame.title.clone());
        let bytes = write_pdf(&pages, &self.format, &PdfInfo::new(title))?;
        Ok(ExportArtifact {
            bytes,
            pages: pages.len(),
            used_fallback,
        })
    }

    fn primary(&self, document: &RenderedDocument) -> Result<Vec<RgbImage>, RasterError> {
        let surface = layout(document, &self.measure, &self.images);
        self.capture(&surface)
    }

    fn fallback(&self, source: &str) -> Result<Vec<RgbImage>, RasterError> {
        let surface = fallback_surface(source, &self.measure);
        self.capture(&surface)
    }

    fn capture(&self, surface: &Surface) -> Result<Vec<RgbImage>, RasterError> {
        let bitmap = self.rasterizer.rasterize(surface, self.scale)?;
        paginate(&bitmap, &self.format)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resvg::usvg::fontdb::Database;

    use super::*;

    /// Fails on the chosen surface kinds, delegates otherwise.
    struct Failing {
        fail_on: Vec<SurfaceKind>,
        inner: ResvgRasterizer,
    }

    impl Rasterizer for Failing {
        fn rasterize(&self, surface: &Surface, scale: f32) -> Result<image::RgbaImage, RasterError> {
            if self.fail_on.contains(&surface.kind()) {
                return Err(RasterError::Other(format!("forced {:?} failure", surface.kind())));
            }
            self.inner.rasterize(surface, scale)
        }
    }

    fn exporter(fail_on: Vec<SurfaceKind>) -> Exporter {
        let inner = ResvgRasterizer::with_fontdb(Arc::new(Database::new()));
        Exporter::new()
            .with_measure(TextMeasure::heuristic())
            .with_rasterizer(Failing { fail_on, inner })
    }

    #[test]
    fn test_primary_path_does_not_use_fallback() {
        let artifact = exporter(vec![])
            .export_to_artifact(ExportInput::Markdown("# Weekly\n\nAll good."))
            .unwrap();
        assert!(!artifact.used_fallback);
        assert_eq!(artifact.pages, 1);
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_forced_primary_failure_uses_fallback() {
        let artifact = exporter(vec![SurfaceKind::Rendered])
            .export_to_artifact(ExportInput::Markdown("# Weekly\n\n- a\n- b"))
            .unwrap();
        assert!(artifact.used_fallback);
        assert_eq!(artifact.pages, 1);
    }

    #[test]
    fn test_both_paths_failing_names_both_causes() {
        let err = exporter(vec![SurfaceKind::Rendered, SurfaceKind::Fallback])
            .export_to_artifact(ExportInput::Markdown("text"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("forced Rendered failure"));
        assert!(message.contains("forced Fallback failure"));
    }

    #[test]
    fn test_document_without_source_falls_back_from_elements() {
        let document = crate::render::render(
            crate::markdown::parse("# Weekly\n\n- Depot A\n- Depot B"),
            Profile::Print,
        );
        assert!(document.source().is_none());
        let artifact = exporter(vec![SurfaceKind::Rendered])
            .export_to_artifact(ExportInput::Document(&document))
            .unwrap();
        assert!(artifact.used_fallback);
        assert_eq!(artifact.pages, 1);
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }
}
