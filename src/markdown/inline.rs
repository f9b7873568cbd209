//! Inline substitution: code spans, emphasis and links.
//!
//! Patterns run in a fixed order over the text runs left by the previous
//! pass. Code spans are cut out first and never touched again. Each later
//! pattern only matches inside a single run, so markers that straddle a run
//! boundary stay literal.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::types::{Emphasis, Inline, InlineSequence};

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+?)\*|_([^_]+?)_").expect("valid regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

/// Parse the inline content of a block.
pub fn parse_inline(text: &str) -> InlineSequence {
    let runs = split_code_spans(text);
    let runs = substitute(runs, &BOLD, |caps, emphasis| Inline::Text {
        text: caps[1].to_string(),
        emphasis: emphasis.with_strong(),
    });
    let runs = substitute(runs, &ITALIC, |caps, emphasis| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        Inline::Text {
            text: inner.to_string(),
            emphasis: emphasis.with_italic(),
        }
    });
    let runs = substitute(runs, &LINK, |caps, emphasis| {
        let url = caps[3].to_string();
        let label = if caps[2].is_empty() {
            url.clone()
        } else {
            caps[2].to_string()
        };
        Inline::Link {
            label,
            url,
            emphasis,
        }
    });
    InlineSequence::new(runs)
}

fn split_code_spans(text: &str) -> Vec<Inline> {
    let mut runs = Vec::new();
    let mut last = 0;
    for caps in CODE_SPAN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            runs.push(Inline::text(&text[last..whole.start()]));
        }
        runs.push(Inline::Code(caps[1].to_string()));
        last = whole.end();
    }
    if last < text.len() {
        runs.push(Inline::text(&text[last..]));
    }
    runs
}

/// Apply one pattern to every plain text run, splitting it around matches.
fn substitute(
    runs: Vec<Inline>,
    pattern: &Regex,
    make: impl Fn(&Captures<'_>, Emphasis) -> Inline,
) -> Vec<Inline> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        let Inline::Text { text, emphasis } = run else {
            out.push(run);
            continue;
        };
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                out.push(Inline::Text {
                    text: text[last..whole.start()].to_string(),
                    emphasis,
                });
            }
            out.push(make(&caps, emphasis));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Inline::Text {
                text: text[last..].to_string(),
                emphasis,
            });
        }
    }
    out
}
