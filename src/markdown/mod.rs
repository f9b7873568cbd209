//! Markdown parsing.
//!
//! This module handles:
//! - Splitting report text into typed blocks, one source line at a time
//! - Inline substitution of code spans, emphasis and links
//!
//! The parser is permissive: it has no error path.

mod inline;
mod parser;
mod types;

pub use inline::parse_inline;
pub use parser::parse;
pub(crate) use parser::list_item;
pub use types::{Block, Emphasis, Inline, InlineSequence};
