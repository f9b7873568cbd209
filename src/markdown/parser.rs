//! Line-oriented markdown block parser.

use once_cell::sync::Lazy;
use regex::Regex;

use super::inline::parse_inline;
use super::types::{Block, InlineSequence};

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)\s+(.*)$").expect("valid regex"));
static UNORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[*+-]\s+(.*)$").expect("valid regex"));
static ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid regex"));
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-{3,}\s*$").expect("valid regex"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)\s]+)\)(.*)$").expect("valid regex"));
static TABLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|(\s*:?-+:?\s*\|)+\s*$").expect("valid regex"));

const FENCE: &str = "```";

/// Match a list item line, returning whether it is ordered and its text.
///
/// Any whitespace may follow the marker.
pub(crate) fn list_item(line: &str) -> Option<(bool, &str)> {
    if let Some(caps) = UNORDERED.captures(line) {
        return caps.get(1).map(|m| (false, m.as_str().trim()));
    }
    ORDERED
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| (true, m.as_str().trim()))
}

/// Parse markdown into a flat block sequence.
///
/// Never fails: every input, including the empty string, yields a (possibly
/// empty) sequence of blocks in source order.
///
/// # Example
///
/// ```
/// use fleetreport::markdown::{parse, Block};
///
/// let blocks = parse("### Title");
/// assert!(matches!(&blocks[0], Block::Heading { level: 3, .. }));
/// ```
pub fn parse(source: &str) -> Vec<Block> {
    let _scope = crate::perf::scope("markdown.parse");
    let mut blocks = Vec::new();
    let mut lines = source.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(info) = trimmed.strip_prefix(FENCE) {
            let language = Some(info.trim())
                .filter(|lang| !lang.is_empty())
                .map(ToString::to_string);
            let mut body = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with(FENCE) {
                    break;
                }
                body.push(inner);
            }
            blocks.push(Block::CodeBlock {
                language,
                raw_text: body.join("\n"),
            });
            continue;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            #[allow(clippy::cast_possible_truncation)]
            let level = caps[1].len().clamp(1, 6) as u8;
            blocks.push(Block::Heading {
                level,
                text: parse_inline(caps[2].trim()),
            });
            continue;
        }

        if RULE.is_match(line) {
            blocks.push(Block::Rule);
            continue;
        }

        if let Some((ordered, text)) = list_item(line) {
            blocks.push(Block::ListItem {
                ordered,
                text: parse_inline(text),
            });
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            blocks.push(Block::Blockquote(parse_inline(rest.trim())));
            continue;
        }

        if is_table_row(trimmed) {
            if TABLE_SEPARATOR.is_match(trimmed) {
                // A separator with no row above it carries no content.
                continue;
            }
            let is_header = lines
                .peek()
                .is_some_and(|next| TABLE_SEPARATOR.is_match(next.trim()));
            if is_header {
                lines.next();
            }
            blocks.push(Block::TableRow {
                cells: split_cells(trimmed),
                is_header,
            });
            continue;
        }

        if let Some(caps) = IMAGE.captures(trimmed) {
            blocks.push(Block::Image {
                alt: caps[1].to_string(),
                url: caps[2].to_string(),
            });
            let rest = caps[3].trim();
            if !rest.is_empty() {
                blocks.push(Block::Paragraph(parse_inline(rest)));
            }
            continue;
        }

        blocks.push(Block::Paragraph(parse_inline(trimmed)));
    }

    crate::perf::log_event("markdown.parse", format!("blocks={}", blocks.len()));
    blocks
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn split_cells(row: &str) -> Vec<InlineSequence> {
    let inner = &row[1..row.len() - 1];
    inner
        .split('|')
        .map(|cell| parse_inline(cell.trim()))
        .collect()
}
