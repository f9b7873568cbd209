//! Style tables for the two render profiles.
//!
//! Sizes are in layout units (CSS pixels at 96 dpi). Both the HTML
//! serializer and the export surface read from the same table so on-screen
//! and exported output agree.

use super::{InlineColor, Profile};
use crate::highlight::HighlightBackground;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    Sans,
    Serif,
    Mono,
}

impl FontKind {
    pub const fn css_stack(self) -> &'static str {
        match self {
            Self::Sans => "'Helvetica Neue', Arial, sans-serif",
            Self::Serif => "Georgia, 'Times New Roman', serif",
            Self::Mono => "'DejaVu Sans Mono', Menlo, Consolas, monospace",
        }
    }
}

/// Text style for one kind of block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontKind,
    pub size: f32,
    pub line_height: f32,
    pub color: InlineColor,
    pub bold: bool,
    pub italic: bool,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

/// Background and default text color of a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePanel {
    pub background: InlineColor,
    pub text: InlineColor,
}

/// Every visual constant a profile needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleTable {
    pub page_background: InlineColor,
    pub headings: [TextStyle; 6],
    pub paragraph: TextStyle,
    pub list_item: TextStyle,
    pub list_indent: f32,
    pub blockquote: TextStyle,
    pub blockquote_bar: InlineColor,
    pub code: TextStyle,
    pub code_dark: CodePanel,
    pub code_light: CodePanel,
    pub code_padding: f32,
    pub inline_code_background: InlineColor,
    pub link: InlineColor,
    pub rule: InlineColor,
    pub table: TextStyle,
    pub table_border: InlineColor,
    pub table_header_background: InlineColor,
    pub image_placeholder: InlineColor,
    pub header_title: TextStyle,
    pub header_meta: TextStyle,
    pub footer: TextStyle,
    pub page_padding: f32,
}

const fn text(
    font: FontKind,
    size: f32,
    color: InlineColor,
    bold: bool,
    margin_top: f32,
    margin_bottom: f32,
) -> TextStyle {
    TextStyle {
        font,
        size,
        line_height: size * 1.5,
        color,
        bold,
        italic: false,
        margin_top,
        margin_bottom,
    }
}

const INK: InlineColor = InlineColor::rgb(0x1f, 0x29, 0x37);
const MUTED: InlineColor = InlineColor::rgb(0x6b, 0x72, 0x80);
const ACCENT: InlineColor = InlineColor::rgb(0x1d, 0x4e, 0xd8);

static INTERACTIVE: StyleTable = StyleTable {
    page_background: InlineColor::rgb(0xff, 0xff, 0xff),
    headings: [
        text(FontKind::Sans, 30.0, INK, true, 8.0, 16.0),
        text(FontKind::Sans, 24.0, INK, true, 24.0, 12.0),
        text(FontKind::Sans, 20.0, INK, true, 20.0, 10.0),
        text(FontKind::Sans, 18.0, INK, true, 16.0, 8.0),
        text(FontKind::Sans, 16.0, INK, true, 12.0, 8.0),
        text(FontKind::Sans, 14.0, MUTED, true, 12.0, 8.0),
    ],
    paragraph: text(FontKind::Sans, 16.0, INK, false, 0.0, 12.0),
    list_item: text(FontKind::Sans, 16.0, INK, false, 0.0, 4.0),
    list_indent: 28.0,
    blockquote: TextStyle {
        italic: true,
        ..text(FontKind::Sans, 16.0, MUTED, false, 4.0, 12.0)
    },
    blockquote_bar: InlineColor::rgb(0x93, 0xc5, 0xfd),
    code: text(FontKind::Mono, 14.0, INK, false, 4.0, 16.0),
    code_dark: CodePanel {
        background: InlineColor::rgb(0x2b, 0x30, 0x3b),
        text: InlineColor::rgb(0xc0, 0xc5, 0xce),
    },
    code_light: CodePanel {
        background: InlineColor::rgb(0xf6, 0xf8, 0xfa),
        text: INK,
    },
    code_padding: 12.0,
    inline_code_background: InlineColor::rgb(0xf3, 0xf4, 0xf6),
    link: ACCENT,
    rule: InlineColor::rgb(0xe5, 0xe7, 0xeb),
    table: text(FontKind::Sans, 14.0, INK, false, 4.0, 16.0),
    table_border: InlineColor::rgb(0xd1, 0xd5, 0xdb),
    table_header_background: InlineColor::rgb(0xf9, 0xfa, 0xfb),
    image_placeholder: InlineColor::rgb(0x9c, 0xa3, 0xaf),
    header_title: text(FontKind::Sans, 26.0, INK, true, 0.0, 4.0),
    header_meta: text(FontKind::Sans, 12.0, MUTED, false, 0.0, 12.0),
    footer: text(FontKind::Sans, 11.0, MUTED, false, 24.0, 0.0),
    page_padding: 32.0,
};

// Print never uses a dark panel; paper stays light.
const PRINT_CODE: CodePanel = CodePanel {
    background: InlineColor::rgb(0xf3, 0xf4, 0xf6),
    text: INK,
};

static PRINT: StyleTable = StyleTable {
    page_background: InlineColor::rgb(0xff, 0xff, 0xff),
    headings: [
        text(FontKind::Serif, 26.0, INK, true, 8.0, 14.0),
        text(FontKind::Serif, 21.0, INK, true, 20.0, 10.0),
        text(FontKind::Serif, 18.0, INK, true, 16.0, 8.0),
        text(FontKind::Serif, 16.0, INK, true, 12.0, 6.0),
        text(FontKind::Serif, 14.0, INK, true, 10.0, 6.0),
        text(FontKind::Serif, 13.0, MUTED, true, 10.0, 6.0),
    ],
    paragraph: text(FontKind::Serif, 14.0, INK, false, 0.0, 10.0),
    list_item: text(FontKind::Serif, 14.0, INK, false, 0.0, 3.0),
    list_indent: 24.0,
    blockquote: TextStyle {
        italic: true,
        ..text(FontKind::Serif, 14.0, MUTED, false, 4.0, 10.0)
    },
    blockquote_bar: InlineColor::rgb(0x9c, 0xa3, 0xaf),
    code: text(FontKind::Mono, 12.0, INK, false, 4.0, 12.0),
    code_dark: PRINT_CODE,
    code_light: PRINT_CODE,
    code_padding: 10.0,
    inline_code_background: InlineColor::rgb(0xf3, 0xf4, 0xf6),
    link: ACCENT,
    rule: InlineColor::rgb(0xd1, 0xd5, 0xdb),
    table: text(FontKind::Serif, 12.0, INK, false, 4.0, 12.0),
    table_border: InlineColor::rgb(0x9c, 0xa3, 0xaf),
    table_header_background: InlineColor::rgb(0xf3, 0xf4, 0xf6),
    image_placeholder: MUTED,
    header_title: text(FontKind::Serif, 22.0, INK, true, 0.0, 4.0),
    header_meta: text(FontKind::Sans, 11.0, MUTED, false, 0.0, 10.0),
    footer: text(FontKind::Sans, 10.0, MUTED, false, 24.0, 0.0),
    page_padding: 40.0,
};

/// The style table for `profile`.
pub fn style_table(profile: Profile) -> &'static StyleTable {
    match profile {
        Profile::Interactive => &INTERACTIVE,
        Profile::Print => &PRINT,
    }
}

impl StyleTable {
    /// Style for a heading of `level` (clamped to 1-6).
    pub fn heading(&self, level: u8) -> &TextStyle {
        let index = usize::from(level.clamp(1, 6)) - 1;
        &self.headings[index]
    }

    pub const fn code_panel(&self, background: HighlightBackground) -> CodePanel {
        match background {
            HighlightBackground::Dark => self.code_dark,
            HighlightBackground::Light => self.code_light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_sizes_decrease_with_level() {
        for profile in [Profile::Interactive, Profile::Print] {
            let table = style_table(profile);
            for level in 1..6 {
                assert!(table.heading(level).size > table.heading(level + 1).size);
            }
        }
    }

    #[test]
    fn test_print_code_is_monospace_on_light_background() {
        let table = style_table(Profile::Print);
        assert_eq!(table.code.font, FontKind::Mono);
        let panel = table.code_panel(HighlightBackground::Dark);
        assert!(panel.background.r > 0xe0);
    }

    #[test]
    fn test_heading_level_is_clamped() {
        let table = style_table(Profile::Interactive);
        assert_eq!(table.heading(0), table.heading(1));
        assert_eq!(table.heading(9), table.heading(6));
    }
}
