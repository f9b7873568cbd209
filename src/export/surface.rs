//! Off-screen export surfaces.

/// Which renderer produced a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Laid out from a rendered document
    Rendered,
    /// Built by the minimal markdown renderer after the primary path failed
    Fallback,
}

/// A fully laid-out SVG document ready to rasterize.
///
/// The surface owns its markup and is released when dropped, on every exit
/// path of an export.
#[derive(Debug)]
pub struct Surface {
    svg: String,
    width: f32,
    height: f32,
    kind: SurfaceKind,
}

impl Surface {
    pub fn new(svg: String, width: f32, height: f32, kind: SurfaceKind) -> Self {
        crate::perf::log_event(
            "export.surface.create",
            format!("kind={kind:?} size={width}x{height} bytes={}", svg.len()),
        );
        Self {
            svg,
            width,
            height,
            kind,
        }
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub const fn width(&self) -> f32 {
        self.width
    }

    pub const fn height(&self) -> f32 {
        self.height
    }

    pub const fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        tracing::trace!(kind = ?self.kind, "surface released");
        crate::perf::log_event("export.surface.release", format!("kind={:?}", self.kind));
    }
}

/// Incremental SVG writer used by both surface builders.
#[derive(Debug, Default)]
pub(crate) struct SvgWriter {
    body: String,
}

impl SvgWriter {
    pub(crate) fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: &str) {
        self.body.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{fill}\"/>\n"
        ));
    }

    pub(crate) fn rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: &str,
    ) {
        self.body.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"{radius:.2}\" fill=\"{fill}\"/>\n"
        ));
    }

    pub(crate) fn outline(&mut self, x: f32, y: f32, width: f32, height: f32, stroke: &str) {
        self.body.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1\"/>\n"
        ));
    }

    pub(crate) fn hline(&mut self, x1: f32, x2: f32, y: f32, stroke: &str) {
        self.body.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y:.2}\" x2=\"{x2:.2}\" y2=\"{y:.2}\" stroke=\"{stroke}\" stroke-width=\"1\"/>\n"
        ));
    }

    /// One run of text at a baseline. `attrs` is spliced in verbatim.
    pub(crate) fn text(&mut self, x: f32, baseline: f32, attrs: &str, text: &str) {
        self.body.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{baseline:.2}\" {attrs}>{}</text>\n",
            crate::render::escape_html(text)
        ));
    }

    pub(crate) fn image(&mut self, x: f32, y: f32, width: f32, height: f32, href: &str) {
        self.body.push_str(&format!(
            "<image x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" xlink:href=\"{}\"/>\n",
            crate::render::escape_html(href)
        ));
    }

    /// Wrap the body in an `<svg>` root with an opaque page background.
    pub(crate) fn finish(
        self,
        width: f32,
        height: f32,
        background: &str,
        kind: SurfaceKind,
    ) -> Surface {
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
             width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" xml:space=\"preserve\">\n\
             <rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{background}\"/>\n{}</svg>\n",
            self.body
        );
        Surface::new(svg, width, height, kind)
    }
}
