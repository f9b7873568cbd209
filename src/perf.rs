//! Timing scopes and the render debug log.
//!
//! Scopes report through `tracing` when `--perf` is on. The debug log is a
//! plain append-only file of timestamped pipeline events (parse, render,
//! surface, raster, pagination, fallback).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: LazyLock<Mutex<Option<DebugLog>>> = LazyLock::new(|| Mutex::new(None));

/// Times a pipeline stage until dropped.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(target: "fleetreport::perf", scope = self.name, elapsed_ms, "timing");
        log_event("perf", format!("{} took {elapsed_ms:.3} ms", self.name));
    }
}

#[derive(Debug)]
struct DebugLog {
    start: Instant,
    writer: BufWriter<File>,
}

impl DebugLog {
    fn write(&mut self, name: &str, detail: &str) -> std::io::Result<()> {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        writeln!(self.writer, "[{elapsed_ms:>10.3} ms] {name}: {detail}")?;
        self.writer.flush()
    }
}

fn debug_log() -> MutexGuard<'static, Option<DebugLog>> {
    match DEBUG_LOG.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Start (or stop, with `None`) writing pipeline events to `path`.
///
/// # Errors
/// Returns an error if the log file cannot be created.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut slot = debug_log();
    let Some(path) = path else {
        *slot = None;
        return Ok(());
    };
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "fleetreport debug log started {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writer.flush()?;
    *slot = Some(DebugLog {
        start: Instant::now(),
        writer,
    });
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    debug_log().is_some()
}

/// Record a pipeline event in the debug log, if one is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let detail = detail.as_ref();
    tracing::trace!(target: "fleetreport::events", event = name, detail);
    if let Some(log) = debug_log().as_mut() {
        let _ = log.write(name, detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_toggles_runtime_flag() {
        set_enabled(true);
        assert!(is_enabled());

        set_enabled(false);
        assert!(!is_enabled());
    }

    #[test]
    fn test_debug_log_path_enables_logging_and_writes() {
        let temp_file = NamedTempFile::new().unwrap();
        set_debug_log_path(Some(temp_file.path())).unwrap();
        assert!(is_debug_log_enabled());
        log_event("export.surface", "width=800 height=1200");
        set_debug_log_path(None).unwrap();
        assert!(!is_debug_log_enabled());
        log_event("export.surface", "after close");

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.starts_with("fleetreport debug log started "));
        assert!(content.contains("export.surface: width=800 height=1200"));
        assert!(!content.contains("after close"));
    }
}
