// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. export::ExportError)
    clippy::module_name_repetitions
)]

//! # Fleetreport
//!
//! Markdown operations reports for a bus agency, rendered to styled HTML and
//! exported as paginated PDF.
//!
//! - Line-oriented markdown parsing with a small inline grammar
//! - Two rendering profiles: interactive (themed, highlighted code) and print
//!   (letter style with header and footer)
//! - PDF export through an off-screen surface, with a minimal renderer as the
//!   fallback path
//! - Drafting reports from metrics with an external language model
//!
//! ## Pipeline
//!
//! ```text
//! markdown ──parse──▶ Vec<Block> ──render──▶ RenderedDocument
//!                                                 │
//!                      to_html ◀──────────────────┤
//!                                                 ▼
//!                     layout ▶ Surface ▶ rasterize ▶ paginate ▶ PDF
//! ```
//!
//! ## Modules
//!
//! - [`markdown`]: Block and inline parsing
//! - [`render`]: Profiles, the rendered tree and HTML output
//! - [`highlight`]: Syntax highlighting, loaded in the background
//! - [`image`]: Local image loading for export
//! - [`export`]: Surface layout, rasterization, pagination and PDF writing
//! - [`report`]: Report drafting and the credential store
//! - [`config`]: Saved default flags
//! - [`watcher`]: File watching for `export --watch`

pub mod config;
pub mod error;
pub mod export;
pub mod highlight;
pub mod image;
pub mod markdown;
pub mod perf;
pub mod render;
pub mod report;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ExportError, ReportError};
    pub use crate::export::{ExportInput, Exporter};
    pub use crate::markdown::{Block, parse};
    pub use crate::render::{Profile, RenderOptions, RenderedDocument, render_markdown, to_html};
}
