//! Minimal PDF writer for page images.
//!
//! Each page is a single RGB image XObject, Flate-compressed, drawn into
//! the page's content area. The file layout is the classic one: header,
//! numbered objects, cross-reference table, trailer.

use std::io::{self, Write};

use chrono::{DateTime, Local};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbImage;

use super::paginate::PageFormat;

/// Document information dictionary entries.
#[derive(Debug, Clone)]
pub struct PdfInfo {
    pub title: String,
    pub producer: String,
    pub created: DateTime<Local>,
}

impl PdfInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            producer: format!("fleetreport {}", env!("CARGO_PKG_VERSION")),
            created: Local::now(),
        }
    }
}

struct PdfBuffer {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuffer {
    fn new(object_count: usize) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            bytes,
            offsets: vec![0; object_count],
        }
    }

    fn begin(&mut self, id: usize) {
        self.offsets[id - 1] = self.bytes.len();
        self.bytes.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn object(&mut self, id: usize, body: &str) {
        self.begin(id);
        self.bytes.extend_from_slice(body.as_bytes());
        self.bytes.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.begin(id);
        self.bytes
            .extend_from_slice(format!("<< {dict} /Length {} >>\nstream\n", data.len()).as_bytes());
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref = self.bytes.len();
        let count = self.offsets.len() + 1;
        self.bytes
            .extend_from_slice(format!("xref\n0 {count}\n0000000000 65535 f \n").as_bytes());
        for offset in &self.offsets {
            self.bytes
                .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.bytes.extend_from_slice(
            format!(
                "trailer\n<< /Size {count} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        self.bytes
    }
}

/// Assemble page images into a PDF document.
pub fn write_pdf(pages: &[RgbImage], format: &PageFormat, info: &PdfInfo) -> io::Result<Vec<u8>> {
    const CATALOG: usize = 1;
    const PAGES: usize = 2;
    const INFO: usize = 3;
    const FIRST_PAGE: usize = 4;
    let _scope = crate::perf::scope("export.pdf");

    let object_count = 3 + pages.len() * 3;
    let mut pdf = PdfBuffer::new(object_count);

    pdf.object(CATALOG, &format!("<< /Type /Catalog /Pages {PAGES} 0 R >>"));

    let kids: Vec<String> = (0..pages.len())
        .map(|index| format!("{} 0 R", FIRST_PAGE + index * 3))
        .collect();
    pdf.object(
        PAGES,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    );

    pdf.object(
        INFO,
        &format!(
            "<< /Title {} /Producer {} /CreationDate {} >>",
            pdf_string(&info.title),
            pdf_string(&info.producer),
            pdf_string(&pdf_date(&info.created))
        ),
    );

    let (page_w, page_h) = (format.width_pt(), format.height_pt());
    let margin = format.margin_pt();
    let draw_w = format.content_width_pt();

    for (index, page) in pages.iter().enumerate() {
        let page_id = FIRST_PAGE + index * 3;
        let content_id = page_id + 1;
        let image_id = page_id + 2;
        let (px_w, px_h) = page.dimensions();

        let draw_h = draw_w * f64::from(px_h) / f64::from(px_w.max(1));
        let y = page_h - margin - draw_h;

        pdf.object(
            page_id,
            &format!(
                "<< /Type /Page /Parent {PAGES} 0 R /MediaBox [0 0 {page_w:.2} {page_h:.2}] \
                 /Resources << /XObject << /Im0 {image_id} 0 R >> >> /Contents {content_id} 0 R >>"
            ),
        );

        let content = format!("q\n{draw_w:.4} 0 0 {draw_h:.4} {margin:.4} {y:.4} cm\n/Im0 Do\nQ\n");
        pdf.stream(content_id, "", content.as_bytes());

        let compressed = deflate(page.as_raw())?;
        pdf.stream(
            image_id,
            &format!(
                "/Type /XObject /Subtype /Image /Width {px_w} /Height {px_h} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode"
            ),
            &compressed,
        );
    }

    let bytes = pdf.finish(CATALOG, INFO);
    crate::perf::log_event(
        "export.pdf",
        format!("pages={} bytes={}", pages.len(), bytes.len()),
    );
    Ok(bytes)
}

fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(data)?;
    encoder.finish()
}

/// `D:YYYYMMDDHHmmSS+HH'mm'`
fn pdf_date(at: &DateTime<Local>) -> String {
    let offset = at.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "D:{}{sign}{:02}'{:02}'",
        at.format("%Y%m%d%H%M%S"),
        offset / 3600,
        (offset % 3600) / 60
    )
}

/// Literal string for ASCII, UTF-16BE hex string otherwise.
fn pdf_string(text: &str) -> String {
    if text.is_ascii() {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('(');
        for ch in text.chars() {
            match ch {
                '(' | ')' | '\\' => {
                    out.push('\\');
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(ch),
            }
        }
        out.push(')');
        return out;
    }
    let mut out = String::from("<FEFF");
    for unit in text.encode_utf16() {
        out.push_str(&format!("{unit:04X}"));
    }
    out.push('>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgb;

    fn page() -> RgbImage {
        RgbImage::from_pixel(19, 28, Rgb([255, 255, 255]))
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_structure_for_three_pages() {
        let bytes = write_pdf(&[page(), page(), page()], &PageFormat::A4, &PdfInfo::new("Q3"))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert_eq!(count(&bytes, b"/Count 3"), 1);
        assert_eq!(count(&bytes, b"/Type /Page "), 3);
        assert_eq!(count(&bytes, b"/Subtype /Image"), 3);
        assert_eq!(count(&bytes, b"xref\n0 13\n"), 1);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = write_pdf(&[page()], &PageFormat::A4, &PdfInfo::new("T")).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let xref_at = text.rfind("\nxref\n").unwrap() + 1;
        let entries: Vec<usize> = text[xref_at..]
            .lines()
            .skip(3)
            .take_while(|line| line.ends_with(" n "))
            .map(|line| line[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 6);
        for (index, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", index + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
    }

    #[test]
    fn test_pdf_string_escapes() {
        assert_eq!(pdf_string("a(b)\\"), "(a\\(b\\)\\\\)");
        assert_eq!(pdf_string("é"), "<FEFF00E9>");
    }

    #[test]
    fn test_pdf_date_format() {
        let at = Local.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let date = pdf_date(&at);
        assert!(date.starts_with("D:20300102030405"));
    }
}
