//! Error types for rendering, export and report drafting.

use std::io;

use thiserror::Error;

/// The syntax highlighter could not be loaded.
///
/// Recovered locally: code blocks keep their unhighlighted text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax highlighting unavailable: {0}")]
pub struct CapabilityError(pub String);

/// Off-screen surface capture failed.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("surface is empty ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    #[error("invalid surface markup: {0}")]
    Svg(#[from] resvg::usvg::Error),

    #[error("failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("failed to build bitmap from pixmap data")]
    Bitmap,

    #[error("{0}")]
    Other(String),
}

/// Export failed; nothing was written to the destination.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export failed: {primary}; fallback failed: {fallback}")]
    Exhausted {
        primary: RasterError,
        fallback: RasterError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure talking to the report-drafting service.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("report service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed service response: {0}")]
    MalformedResponse(String),
}

/// Failure reading or writing the key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("corrupt store {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
