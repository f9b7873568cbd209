//! Lays a rendered document out onto an SVG surface.
//!
//! The layout is computed completely here, including line wrapping against
//! measured font widths, so the rasterizer never waits for anything.

use crate::image::ImageLoader;
use crate::render::{
    CodeElement, Element, FontKind, InlineColor, InlineStyle, PrintFrame, RenderedDocument,
    StyleTable, StyledSpan, TableRowElement, TextStyle, style_table,
};

use super::metrics::TextMeasure;
use super::surface::{Surface, SurfaceKind, SvgWriter};

/// Width of every export surface, in layout units.
pub const SURFACE_WIDTH: f32 = 800.0;

const CELL_PADDING_X: f32 = 8.0;
const CELL_PADDING_Y: f32 = 6.0;
const QUOTE_INDENT: f32 = 16.0;
const PLACEHOLDER_HEIGHT: f32 = 56.0;

/// Lay out `document` into a surface ready for rasterization.
pub fn layout(document: &RenderedDocument, measure: &TextMeasure, images: &ImageLoader) -> Surface {
    let _scope = crate::perf::scope("export.layout");
    let table = style_table(document.profile());
    let mut page = Layout {
        svg: SvgWriter::default(),
        measure,
        images,
        table,
        code_panel_fill: table.code_panel(document.code_theme()).background,
        code_text: table.code_panel(document.code_theme()).text,
        left: table.page_padding,
        right: SURFACE_WIDTH - table.page_padding,
        y: table.page_padding,
    };

    if let Some(frame) = document.frame() {
        page.header(frame);
    }
    for element in document.elements() {
        page.element(element);
    }
    if let Some(frame) = document.frame() {
        page.footer(frame);
    }

    let height = (page.y + table.page_padding).ceil();
    page.svg.finish(
        SURFACE_WIDTH,
        height,
        &table.page_background.hex(),
        SurfaceKind::Rendered,
    )
}

/// A run of text placed on one line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Piece {
    pub text: String,
    pub style: InlineStyle,
    pub x: f32,
    pub width: f32,
}

/// Break styled spans into lines no wider than `max_width`.
///
/// Words break at spaces; `anywhere` allows breaks between any two
/// characters, which code lines need. A word wider than the line is placed
/// on its own line rather than split.
pub(crate) fn wrap_spans(
    spans: &[StyledSpan],
    base: &TextStyle,
    measure: &TextMeasure,
    max_width: f32,
    anywhere: bool,
) -> Vec<Vec<Piece>> {
    let mut lines: Vec<Vec<Piece>> = Vec::new();
    let mut line: Vec<Piece> = Vec::new();
    let mut x = 0.0;

    for span in spans {
        let style = span.style();
        let (font, size, bold) = span_font(style, base);
        let tokens: Vec<&str> = if anywhere {
            span.text()
                .char_indices()
                .map(|(i, ch)| &span.text()[i..i + ch.len_utf8()])
                .collect()
        } else {
            span.text().split_inclusive(' ').collect()
        };

        for token in tokens {
            let width = measure.width(token, font, size, bold);
            let visible = measure.width(token.trim_end(), font, size, bold);
            if !line.is_empty() && x + visible > max_width {
                lines.push(std::mem::take(&mut line));
                x = 0.0;
                if !anywhere && token.trim().is_empty() {
                    continue;
                }
            }
            match line.last_mut() {
                Some(last) if last.style == *style => {
                    last.text.push_str(token);
                    last.width += width;
                }
                _ => line.push(Piece {
                    text: token.to_string(),
                    style: style.clone(),
                    x,
                    width,
                }),
            }
            x += width;
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn span_font(style: &InlineStyle, base: &TextStyle) -> (FontKind, f32, bool) {
    if style.code && base.font != FontKind::Mono {
        (FontKind::Mono, base.size * 0.9, false)
    } else {
        (base.font, base.size, base.bold || style.strong)
    }
}

pub(crate) fn text_attrs(
    font: FontKind,
    size: f32,
    bold: bool,
    italic: bool,
    fill: InlineColor,
    underline: bool,
) -> String {
    let mut attrs = format!(
        "font-family=\"{}\" font-size=\"{size:.2}\" fill=\"{}\"",
        font.css_stack(),
        fill.hex()
    );
    if bold {
        attrs.push_str(" font-weight=\"bold\"");
    }
    if italic {
        attrs.push_str(" font-style=\"italic\"");
    }
    if underline {
        attrs.push_str(" text-decoration=\"underline\"");
    }
    attrs
}

/// Baseline for text of `size` centered in a line box of `line_height`.
pub(crate) fn baseline(top: f32, size: f32, line_height: f32) -> f32 {
    top + (line_height + size * 0.7) / 2.0
}

struct Layout<'a> {
    svg: SvgWriter,
    measure: &'a TextMeasure,
    images: &'a ImageLoader,
    table: &'static StyleTable,
    code_panel_fill: InlineColor,
    code_text: InlineColor,
    left: f32,
    right: f32,
    y: f32,
}

impl Layout<'_> {
    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn header(&mut self, frame: &PrintFrame) {
        let title = self.table.header_title;
        let meta = self.table.header_meta;
        self.single_line(&frame.title, &title);
        self.single_line(&frame.generated_at, &meta);
        self.svg
            .hline(self.left, self.right, self.y, &self.table.rule.hex());
        self.y += 16.0;
    }

    fn footer(&mut self, frame: &PrintFrame) {
        let footer = self.table.footer;
        self.y += footer.margin_top;
        self.svg
            .hline(self.left, self.right, self.y, &self.table.rule.hex());
        self.y += 8.0;
        self.single_line(&frame.copyright, &footer);
    }

    fn single_line(&mut self, text: &str, style: &TextStyle) {
        self.y += style.margin_top;
        let attrs = text_attrs(
            style.font,
            style.size,
            style.bold,
            style.italic,
            style.color,
            false,
        );
        self.svg.text(
            self.left,
            baseline(self.y, style.size, style.line_height),
            &attrs,
            text,
        );
        self.y += style.line_height + style.margin_bottom;
    }

    fn element(&mut self, element: &Element) {
        match element {
            Element::Heading { level, spans } => {
                let style = *self.table.heading(*level);
                self.block(spans, &style, self.left, self.width());
            }
            Element::Paragraph(spans) => {
                let style = self.table.paragraph;
                self.block(spans, &style, self.left, self.width());
            }
            Element::List { ordered, items } => self.list(*ordered, items),
            Element::Code(code) => self.code(code),
            Element::Blockquote(spans) => {
                let style = self.table.blockquote;
                let top = self.y + style.margin_top;
                self.block(
                    spans,
                    &style,
                    self.left + QUOTE_INDENT,
                    self.width() - QUOTE_INDENT,
                );
                let bottom = self.y - style.margin_bottom;
                self.svg.rect(
                    self.left,
                    top,
                    4.0,
                    bottom - top,
                    &self.table.blockquote_bar.hex(),
                );
            }
            Element::Rule => {
                self.y += 12.0;
                self.svg
                    .hline(self.left, self.right, self.y, &self.table.rule.hex());
                self.y += 12.0;
            }
            Element::Table(rows) => self.table_rows(rows),
            Element::Image { alt, url } => self.image(alt, url),
        }
    }

    /// Wrapped text block with its margins.
    fn block(&mut self, spans: &[StyledSpan], style: &TextStyle, x: f32, width: f32) {
        self.y += style.margin_top;
        let lines = wrap_spans(spans, style, self.measure, width, false);
        for line in &lines {
            self.line(line, style, x, self.y, style.color);
            self.y += style.line_height;
        }
        self.y += style.margin_bottom;
    }

    fn line(&mut self, pieces: &[Piece], base: &TextStyle, x: f32, top: f32, color: InlineColor) {
        for piece in pieces {
            let (font, size, bold) = span_font(&piece.style, base);
            if piece.style.code && base.font != FontKind::Mono {
                self.svg.rounded_rect(
                    x + piece.x - 2.0,
                    top + (base.line_height - size) / 2.0 - 2.0,
                    piece.width + 4.0,
                    size + 4.0,
                    3.0,
                    &self.table.inline_code_background.hex(),
                );
            }
            let fill = piece.style.fg.unwrap_or(if piece.style.link.is_some() {
                self.table.link
            } else {
                color
            });
            let attrs = text_attrs(
                font,
                size,
                bold,
                base.italic || piece.style.emphasis,
                fill,
                piece.style.link.is_some(),
            );
            self.svg.text(
                x + piece.x,
                baseline(top, base.size, base.line_height),
                &attrs,
                &piece.text,
            );
        }
    }

    fn list(&mut self, ordered: bool, items: &[Vec<StyledSpan>]) {
        let style = self.table.list_item;
        let indent = self.table.list_indent;
        self.y += 4.0;
        for (index, item) in items.iter().enumerate() {
            let marker = if ordered {
                format!("{}.", index + 1)
            } else {
                "•".to_string()
            };
            let marker_width = self.measure.width(&marker, style.font, style.size, false);
            let attrs = text_attrs(style.font, style.size, false, false, style.color, false);
            self.svg.text(
                self.left + indent - 8.0 - marker_width,
                baseline(self.y + style.margin_top, style.size, style.line_height),
                &attrs,
                &marker,
            );
            self.block(item, &style, self.left + indent, self.width() - indent);
        }
        self.y += 8.0;
    }

    fn code(&mut self, code: &CodeElement) {
        let style = self.table.code;
        let padding = self.table.code_padding;
        self.y += style.margin_top;

        let inner = self.width() - 2.0 * padding;
        let lines: Vec<Vec<Piece>> = code
            .lines
            .iter()
            .flat_map(|spans| wrap_spans(spans, &style, self.measure, inner, true))
            .collect();
        let visual_lines = lines.len().max(1) as f32;
        let height = visual_lines * style.line_height + 2.0 * padding;
        self.svg.rounded_rect(
            self.left,
            self.y,
            self.width(),
            height,
            6.0,
            &self.code_panel_fill.hex(),
        );

        let mut top = self.y + padding;
        for line in &lines {
            self.line(line, &style, self.left + padding, top, self.code_text);
            top += style.line_height;
        }
        self.y += height + style.margin_bottom;
    }

    fn table_rows(&mut self, rows: &[TableRowElement]) {
        let style = self.table.table;
        let columns = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        self.y += style.margin_top;
        let column_width = self.width() / columns as f32;
        let border = self.table.table_border.hex();

        for row in rows {
            let cell_style = TextStyle {
                bold: row.is_header,
                ..style
            };
            let wrapped: Vec<Vec<Vec<Piece>>> = row
                .cells
                .iter()
                .map(|cell| {
                    wrap_spans(
                        cell,
                        &cell_style,
                        self.measure,
                        column_width - 2.0 * CELL_PADDING_X,
                        false,
                    )
                })
                .collect();
            let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f32 * style.line_height + 2.0 * CELL_PADDING_Y;

            if row.is_header {
                self.svg.rect(
                    self.left,
                    self.y,
                    self.width(),
                    row_height,
                    &self.table.table_header_background.hex(),
                );
            }
            for column in 0..columns {
                let x = self.left + column as f32 * column_width;
                self.svg.outline(x, self.y, column_width, row_height, &border);
                let Some(lines) = wrapped.get(column) else {
                    continue;
                };
                let mut top = self.y + CELL_PADDING_Y;
                for line in lines {
                    self.line(line, &cell_style, x + CELL_PADDING_X, top, style.color);
                    top += style.line_height;
                }
            }
            self.y += row_height;
        }
        self.y += style.margin_bottom;
    }

    fn image(&mut self, alt: &str, url: &str) {
        self.y += 8.0;
        if let Some(embedded) = self.images.embed(url) {
            let (width, height) = embedded.fit_width(self.width());
            self.svg
                .image(self.left, self.y, width, height, &embedded.data_uri);
            self.y += height + 12.0;
            return;
        }

        let color = self.table.image_placeholder;
        self.svg.outline(
            self.left,
            self.y,
            self.width(),
            PLACEHOLDER_HEIGHT,
            &color.hex(),
        );
        let label = if alt.is_empty() {
            format!("[image: {url}]")
        } else {
            format!("[image: {alt}]")
        };
        let style = self.table.paragraph;
        let attrs = text_attrs(style.font, style.size, false, true, color, false);
        self.svg.text(
            self.left + 12.0,
            baseline(
                self.y + (PLACEHOLDER_HEIGHT - style.line_height) / 2.0,
                style.size,
                style.line_height,
            ),
            &attrs,
            &label,
        );
        self.y += PLACEHOLDER_HEIGHT + 12.0;
    }
}
