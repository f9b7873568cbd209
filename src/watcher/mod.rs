//! Watching a report for `export --watch`.
//!
//! Uses notify for cross-platform file system events. Exports write into a
//! directory that is often the watched one, so the exporter's own files are
//! ignored and events raised while exporting can be discarded.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a single markdown file and emits debounced change notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    ignored: Vec<PathBuf>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("target_path", &self.target_path)
            .field("ignored", &self.ignored)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Watch `path`, reporting a change once events stop for `debounce`.
    ///
    /// # Errors
    /// Fails if the backend cannot be created or the directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Backends report canonical absolute paths.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            ignored: Vec::new(),
            debounce,
            pending_since: None,
        })
    }

    /// Never treat events on `path` as a change, e.g. the exported PDF.
    #[must_use]
    pub fn ignoring(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = path
            .parent()
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .and_then(|p| p.canonicalize().ok())
            .zip(path.file_name())
            .map_or_else(|| path.to_path_buf(), |(dir, name)| dir.join(name));
        self.ignored.push(absolute);
        self
    }

    /// Drop everything received so far, including a pending change.
    pub fn discard_pending(&mut self) {
        let mut dropped = 0u32;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        self.pending_since = None;
        if dropped > 0 {
            crate::perf::log_event("watcher.discard", format!("events={dropped}"));
        }
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Returns true once a debounced file change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let tally = self.drain();
        if tally.received > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!(
                    "received={} relevant={} skipped={} target={}",
                    tally.received,
                    tally.relevant,
                    tally.skipped,
                    self.target_path.display(),
                ),
            );
        }
        if tally.relevant > 0 {
            self.pending_since = Some(Instant::now());
        }

        match self.pending_since {
            Some(since) if since.elapsed() >= self.debounce => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    fn drain(&self) -> EventTally {
        let mut tally = EventTally::default();
        while let Ok(event) = self.rx.try_recv() {
            tally.received += 1;
            match event {
                Ok(ev) if self.is_relevant(&ev) => tally.relevant += 1,
                Ok(ev) => {
                    tally.skipped += 1;
                    tracing::trace!(kind = ?ev.kind, paths = ?ev.paths, "skipped watch event");
                }
                Err(err) => {
                    tracing::debug!(%err, "watch backend error");
                    crate::perf::log_event("watcher.error", err.to_string());
                }
            }
        }
        tally
    }

    /// Exporter output: the ignored paths and tempfile staging files.
    fn is_ignored(&self, path: &Path) -> bool {
        if path == self.watch_root || path == self.target_path {
            return false;
        }
        self.ignored.iter().any(|ignored| ignored == path)
            || path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(".tmp"))
    }

    // Some backends only name the directory, so that counts too.
    fn is_relevant(&self, event: &Event) -> bool {
        if event.paths.iter().any(|path| self.is_ignored(path)) {
            return false;
        }
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || path.file_name().is_some_and(|name| Some(name) == self.target_name.as_deref())
        })
    }
}

#[derive(Debug, Default)]
struct EventTally {
    received: u32,
    relevant: u32,
    skipped: u32,
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
