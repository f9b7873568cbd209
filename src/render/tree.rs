//! The rendered visual tree.

use chrono::{DateTime, Datelike, Local};

use super::Profile;
use crate::highlight::{HighlightBackground, Highlighter};

/// RGB color for inline styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl InlineColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`, for HTML and SVG attributes.
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Inline style flags for a text span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    pub link: Option<String>,
    pub fg: Option<InlineColor>,
}

/// A styled inline span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    text: String,
    style: InlineStyle,
}

impl StyledSpan {
    pub const fn new(text: String, style: InlineStyle) -> Self {
        Self { text, style }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text.into(), InlineStyle::default())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn style(&self) -> &InlineStyle {
        &self.style
    }
}

/// A fenced code block in the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeElement {
    /// Stable id used to address highlight upgrades
    pub id: usize,
    pub language: Option<String>,
    pub raw_text: String,
    /// One span list per source line
    pub lines: Vec<Vec<StyledSpan>>,
    pub highlighted: bool,
}

impl CodeElement {
    pub(crate) fn plain(id: usize, language: Option<String>, raw_text: String) -> Self {
        let lines = plain_code_lines(&raw_text);
        Self {
            id,
            language,
            raw_text,
            lines,
            highlighted: false,
        }
    }

    /// Replace the plain lines with highlighted ones.
    ///
    /// Returns false when the block was already upgraded or the language is
    /// not known to the highlighter; in both cases nothing changes.
    pub fn upgrade(&mut self, highlighter: &Highlighter) -> bool {
        if self.highlighted {
            return false;
        }
        let Some(lines) = highlighter.highlight_code(self.language.as_deref(), &self.raw_text)
        else {
            return false;
        };
        self.lines = lines;
        self.highlighted = true;
        true
    }
}

/// Split verbatim code into unstyled monospace lines.
pub fn plain_code_lines(code: &str) -> Vec<Vec<StyledSpan>> {
    code.lines()
        .map(|line| {
            let style = InlineStyle {
                code: true,
                ..InlineStyle::default()
            };
            vec![StyledSpan::new(line.to_string(), style)]
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowElement {
    pub cells: Vec<Vec<StyledSpan>>,
    pub is_header: bool,
}

/// One visual element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Heading { level: u8, spans: Vec<StyledSpan> },
    Paragraph(Vec<StyledSpan>),
    /// Consecutive list items of one kind
    List {
        ordered: bool,
        items: Vec<Vec<StyledSpan>>,
    },
    Code(CodeElement),
    Blockquote(Vec<StyledSpan>),
    Rule,
    /// Consecutive table rows
    Table(Vec<TableRowElement>),
    Image { alt: String, url: String },
}

/// Header and footer wrapped around a print document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintFrame {
    pub title: String,
    pub generated_at: String,
    pub copyright: String,
}

impl PrintFrame {
    pub fn new(title: &str, now: DateTime<Local>) -> Self {
        Self {
            title: title.to_string(),
            generated_at: format!("Generated {}", now.format("%B %-d, %Y %H:%M")),
            copyright: format!("© {} Fleet Operations. All rights reserved.", now.year()),
        }
    }
}

/// Profile-specific visual tree produced by [`super::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    profile: Profile,
    elements: Vec<Element>,
    frame: Option<PrintFrame>,
    source: Option<String>,
    code_theme: HighlightBackground,
}

impl RenderedDocument {
    pub(crate) const fn new(
        profile: Profile,
        elements: Vec<Element>,
        frame: Option<PrintFrame>,
    ) -> Self {
        Self {
            profile,
            elements,
            frame,
            source: None,
            code_theme: HighlightBackground::Dark,
        }
    }

    #[must_use]
    pub const fn with_code_theme(mut self, code_theme: HighlightBackground) -> Self {
        self.code_theme = code_theme;
        self
    }

    /// Remember the markdown this document was rendered from.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub const fn profile(&self) -> Profile {
        self.profile
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub const fn frame(&self) -> Option<&PrintFrame> {
        self.frame.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Background the code panels are drawn for.
    pub const fn code_theme(&self) -> HighlightBackground {
        self.code_theme
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeElement> {
        self.elements.iter().filter_map(|element| match element {
            Element::Code(code) => Some(code),
            _ => None,
        })
    }

    /// Ids of code blocks still showing plain text.
    pub fn pending_code_ids(&self) -> Vec<usize> {
        self.code_blocks()
            .filter(|code| !code.highlighted)
            .map(|code| code.id)
            .collect()
    }

    /// Highlight one code block in place.
    ///
    /// Only interactive documents are upgraded; print documents always keep
    /// plain monospace code. Re-applying to an upgraded block is a no-op.
    pub fn upgrade_code(&mut self, id: usize, highlighter: &Highlighter) -> bool {
        if self.profile != Profile::Interactive {
            return false;
        }
        self.elements
            .iter_mut()
            .find_map(|element| match element {
                Element::Code(code) if code.id == id => Some(code),
                _ => None,
            })
            .is_some_and(|code| code.upgrade(highlighter))
    }
}
