//! Text measurement for surface layout.
//!
//! Advance widths are read from the same font database the rasterizer uses,
//! so wrapped lines match what resvg draws. When no system font matches a
//! family, widths fall back to per-family averages.

use std::collections::HashMap;

use resvg::usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};
use unicode_width::UnicodeWidthChar;

use crate::render::FontKind;

const FIRST_PRINTABLE: u32 = 0x20;
const PRINTABLE_COUNT: usize = 95;

/// Advance widths of printable ASCII for one face, in em.
#[derive(Debug, Clone)]
struct FaceMetrics {
    advances: [f32; PRINTABLE_COUNT],
    /// Used for characters outside printable ASCII, per display column
    fallback: f32,
}

impl FaceMetrics {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, index).ok()?;
        let units = f32::from(face.units_per_em());
        if units <= 0.0 {
            return None;
        }

        let mut advances = [0.0; PRINTABLE_COUNT];
        let mut total = 0.0;
        let mut counted = 0.0;
        for (slot, code) in advances.iter_mut().zip(FIRST_PRINTABLE..) {
            let advance = char::from_u32(code)
                .and_then(|ch| face.glyph_index(ch))
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .map(|advance| f32::from(advance) / units);
            if let Some(advance) = advance {
                *slot = advance;
                total += advance;
                counted += 1.0;
            }
        }
        if counted == 0.0 {
            return None;
        }
        let fallback = total / counted;
        for slot in &mut advances {
            if *slot == 0.0 {
                *slot = fallback;
            }
        }
        Some(Self { advances, fallback })
    }

    fn char_em(&self, ch: char) -> f32 {
        let code = u32::from(ch);
        if (FIRST_PRINTABLE..FIRST_PRINTABLE + PRINTABLE_COUNT as u32).contains(&code) {
            return self.advances[(code - FIRST_PRINTABLE) as usize];
        }
        self.fallback * ch.width().unwrap_or(0) as f32
    }
}

/// Measures rendered text widths in layout units.
#[derive(Debug, Clone, Default)]
pub struct TextMeasure {
    faces: HashMap<(FontKind, bool), FaceMetrics>,
}

impl TextMeasure {
    /// Average-width measurement with no font data.
    pub fn heuristic() -> Self {
        Self::default()
    }

    /// Read advance widths for each family from `db`.
    pub fn from_fontdb(db: &Database) -> Self {
        let _scope = crate::perf::scope("export.metrics");
        let mut faces = HashMap::new();
        for kind in [FontKind::Sans, FontKind::Serif, FontKind::Mono] {
            for bold in [false, true] {
                let family = match kind {
                    FontKind::Sans => Family::SansSerif,
                    FontKind::Serif => Family::Serif,
                    FontKind::Mono => Family::Monospace,
                };
                let query = Query {
                    families: &[family],
                    weight: if bold { Weight::BOLD } else { Weight::NORMAL },
                    stretch: Stretch::Normal,
                    style: Style::Normal,
                };
                let metrics = db
                    .query(&query)
                    .and_then(|id| db.with_face_data(id, FaceMetrics::parse))
                    .flatten();
                if let Some(metrics) = metrics {
                    faces.insert((kind, bold), metrics);
                }
            }
        }
        tracing::debug!(faces = faces.len(), "loaded text metrics");
        Self { faces }
    }

    /// Whether any real font metrics were found.
    pub fn has_font_data(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Width of `text` set in `font` at `size`.
    pub fn width(&self, text: &str, font: FontKind, size: f32, bold: bool) -> f32 {
        let face = self
            .faces
            .get(&(font, bold))
            .or_else(|| self.faces.get(&(font, false)));
        let em: f32 = match face {
            Some(face) => text.chars().map(|ch| face.char_em(ch)).sum(),
            None => heuristic_em(text, font, bold),
        };
        em * size
    }
}

fn heuristic_em(text: &str, font: FontKind, bold: bool) -> f32 {
    let per_column = match font {
        FontKind::Mono => 0.6,
        FontKind::Sans => 0.55,
        FontKind::Serif => 0.52,
    };
    let columns: usize = text.chars().map(|ch| ch.width().unwrap_or(0)).sum();
    let weight = if bold && font != FontKind::Mono { 1.06 } else { 1.0 };
    columns as f32 * per_column * weight
}
