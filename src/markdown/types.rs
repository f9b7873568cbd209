//! Block and inline types produced by the parser.

/// Emphasis flags carried by a text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Emphasis {
    pub strong: bool,
    pub italic: bool,
}

impl Emphasis {
    pub const fn plain() -> Self {
        Self {
            strong: false,
            italic: false,
        }
    }

    #[must_use]
    pub const fn with_strong(mut self) -> Self {
        self.strong = true;
        self
    }

    #[must_use]
    pub const fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// One run of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain or emphasized text.
    Text { text: String, emphasis: Emphasis },
    /// Backtick-delimited code; never re-interpreted.
    Code(String),
    /// `[label](url)`
    Link {
        label: String,
        url: String,
        emphasis: Emphasis,
    },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            emphasis: Emphasis::plain(),
        }
    }

    /// The visible text of this run.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text { text, .. } | Self::Code(text) => text,
            Self::Link { label, .. } => label,
        }
    }
}

/// Ordered inline runs within a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineSequence(Vec<Inline>);

impl InlineSequence {
    pub const fn new(runs: Vec<Inline>) -> Self {
        Self(runs)
    }

    pub fn runs(&self) -> &[Inline] {
        &self.0
    }

    pub fn into_runs(self) -> Vec<Inline> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|run| run.as_str().is_empty())
    }

    /// Concatenated visible text, without markup.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(Inline::as_str).collect()
    }
}

/// One parsed markdown construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading with level (1-6)
    Heading { level: u8, text: InlineSequence },
    Paragraph(InlineSequence),
    /// Flat list item; grouping happens at render time
    ListItem { ordered: bool, text: InlineSequence },
    /// Fenced code, kept verbatim
    CodeBlock {
        language: Option<String>,
        raw_text: String,
    },
    Blockquote(InlineSequence),
    /// Horizontal rule
    Rule,
    TableRow {
        cells: Vec<InlineSequence>,
        is_header: bool,
    },
    Image { alt: String, url: String },
}
