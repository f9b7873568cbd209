//! Block rendering.
//!
//! Maps parsed blocks onto a [`RenderedDocument`] under one of two profiles:
//! - **Interactive**: themed, code blocks upgraded with syntax highlighting
//!   once the highlighter has loaded
//! - **Print**: letter-style page with a header and footer, plain monospace
//!   code
//!
//! The tree is serialized to HTML by [`to_html`] or laid out onto an export
//! surface by [`crate::export`].

mod html;
mod style;
mod tree;

pub use html::{escape_html, is_safe_url, to_html};
pub use style::{CodePanel, FontKind, StyleTable, TextStyle, style_table};
pub use tree::{
    CodeElement, Element, InlineColor, InlineStyle, PrintFrame, RenderedDocument, StyledSpan,
    TableRowElement, plain_code_lines,
};

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::highlight::{Capability, HighlightBackground, HighlightLoader};
use crate::markdown::{self, Block, Inline, InlineSequence};

/// A named set of rendering style rules.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    Interactive,
    Print,
}

/// Inputs to rendering beyond the profile.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Title shown in the print header
    pub title: String,
    /// Timestamp for the print header; `None` means now
    pub generated_at: Option<DateTime<Local>>,
    /// Background the interactive code panels are themed for
    pub code_theme: HighlightBackground,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Fleet Operations Report".to_string(),
            generated_at: None,
            code_theme: HighlightBackground::Dark,
        }
    }
}

/// Render blocks with default options.
pub fn render(blocks: Vec<Block>, profile: Profile) -> RenderedDocument {
    render_with(blocks, profile, &RenderOptions::default())
}

/// Parse and render markdown, keeping the source for export fallback.
pub fn render_markdown(source: &str, profile: Profile, options: &RenderOptions) -> RenderedDocument {
    render_with(markdown::parse(source), profile, options).with_source(source)
}

/// Render blocks into a profile-specific visual tree.
pub fn render_with(blocks: Vec<Block>, profile: Profile, options: &RenderOptions) -> RenderedDocument {
    let _scope = crate::perf::scope("render");
    let mut elements: Vec<Element> = Vec::new();
    let mut next_code_id = 0;

    for block in blocks {
        match block {
            Block::Heading { level, text } => elements.push(Element::Heading {
                level,
                spans: styled_spans(text),
            }),
            Block::Paragraph(text) => elements.push(Element::Paragraph(styled_spans(text))),
            Block::ListItem { ordered, text } => {
                let spans = styled_spans(text);
                match elements.last_mut() {
                    Some(Element::List {
                        ordered: current,
                        items,
                    }) if *current == ordered => items.push(spans),
                    _ => elements.push(Element::List {
                        ordered,
                        items: vec![spans],
                    }),
                }
            }
            Block::CodeBlock { language, raw_text } => {
                elements.push(Element::Code(CodeElement::plain(
                    next_code_id,
                    language,
                    raw_text,
                )));
                next_code_id += 1;
            }
            Block::Blockquote(text) => elements.push(Element::Blockquote(styled_spans(text))),
            Block::Rule => elements.push(Element::Rule),
            Block::TableRow { cells, is_header } => {
                let row = TableRowElement {
                    cells: cells.into_iter().map(styled_spans).collect(),
                    is_header,
                };
                match elements.last_mut() {
                    Some(Element::Table(rows)) => rows.push(row),
                    _ => elements.push(Element::Table(vec![row])),
                }
            }
            Block::Image { alt, url } => elements.push(Element::Image { alt, url }),
        }
    }

    let frame = match profile {
        Profile::Interactive => None,
        Profile::Print => Some(PrintFrame::new(
            &options.title,
            options.generated_at.unwrap_or_else(Local::now),
        )),
    };

    crate::perf::log_event(
        "render",
        format!("profile={profile:?} elements={}", elements.len()),
    );
    RenderedDocument::new(profile, elements, frame).with_code_theme(options.code_theme)
}

pub(crate) fn styled_spans(sequence: InlineSequence) -> Vec<StyledSpan> {
    sequence
        .into_runs()
        .into_iter()
        .map(|run| match run {
            Inline::Text { text, emphasis } => StyledSpan::new(
                text,
                InlineStyle {
                    strong: emphasis.strong,
                    emphasis: emphasis.italic,
                    ..InlineStyle::default()
                },
            ),
            Inline::Code(text) => StyledSpan::new(
                text,
                InlineStyle {
                    code: true,
                    ..InlineStyle::default()
                },
            ),
            Inline::Link {
                label,
                url,
                emphasis,
            } => StyledSpan::new(
                label,
                InlineStyle {
                    strong: emphasis.strong,
                    emphasis: emphasis.italic,
                    link: Some(url),
                    ..InlineStyle::default()
                },
            ),
        })
        .collect()
}

/// Request to highlight one code block in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upgrade {
    pub block_id: usize,
}

/// An interactive document whose code blocks upgrade as highlighting loads.
#[derive(Debug)]
pub struct InteractiveView {
    document: RenderedDocument,
    loader: HighlightLoader,
    queue: VecDeque<Upgrade>,
    posted: bool,
}

impl InteractiveView {
    /// Render `source` and start loading the highlighter in the background.
    pub fn open(source: &str, options: &RenderOptions) -> Self {
        let document = render_markdown(source, Profile::Interactive, options);
        let loader = HighlightLoader::spawn(options.code_theme);
        Self::with_loader(document, loader)
    }

    pub fn with_loader(document: RenderedDocument, loader: HighlightLoader) -> Self {
        Self {
            document,
            loader,
            queue: VecDeque::new(),
            posted: false,
        }
    }

    pub const fn document(&self) -> &RenderedDocument {
        &self.document
    }

    /// Apply any upgrades the loader has made possible.
    ///
    /// Returns the number of code blocks that changed. When the highlighter
    /// becomes ready, one [`Upgrade`] is posted per plain code block; upgrades
    /// only touch their own block.
    pub fn pump(&mut self) -> usize {
        let capability = self.loader.poll();
        self.apply(capability)
    }

    /// Like [`Self::pump`] but waits up to `timeout` for the loader first.
    pub fn settle(&mut self, timeout: std::time::Duration) -> usize {
        let capability = self.loader.wait(timeout);
        self.apply(capability)
    }

    fn apply(&mut self, capability: Capability) -> usize {
        let highlighter = match capability {
            Capability::Pending => return 0,
            Capability::Unavailable(err) => {
                if !self.posted {
                    self.posted = true;
                    tracing::warn!(%err, "code blocks stay unhighlighted");
                }
                return 0;
            }
            Capability::Ready(highlighter) => highlighter,
        };

        if !self.posted {
            self.posted = true;
            self.queue.extend(
                self.document
                    .pending_code_ids()
                    .into_iter()
                    .map(|block_id| Upgrade { block_id }),
            );
        }

        let mut changed = 0;
        while let Some(upgrade) = self.queue.pop_front() {
            if self.document.upgrade_code(upgrade.block_id, &highlighter) {
                changed += 1;
            }
        }
        if changed > 0 {
            crate::perf::log_event("render.highlight_upgrade", format!("blocks={changed}"));
        }
        changed
    }
}
