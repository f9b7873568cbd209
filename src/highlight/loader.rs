//! Deferred highlighter loading.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use super::{HighlightBackground, Highlighter};
use crate::error::CapabilityError;

/// Current state of the highlighting capability.
#[derive(Debug, Clone)]
pub enum Capability {
    Pending,
    Ready(Arc<Highlighter>),
    Unavailable(CapabilityError),
}

#[derive(Debug)]
enum LoaderState {
    Loading(Receiver<Arc<Highlighter>>),
    Ready(Arc<Highlighter>),
    Unavailable(CapabilityError),
}

/// Loads a [`Highlighter`] off the calling thread.
#[derive(Debug)]
pub struct HighlightLoader {
    state: LoaderState,
}

impl HighlightLoader {
    /// Start loading on a background thread.
    pub fn spawn(background: HighlightBackground) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("highlight-load".to_string())
            .spawn(move || {
                let _ = tx.send(Highlighter::shared(background));
            });
        match spawned {
            Ok(_) => Self {
                state: LoaderState::Loading(rx),
            },
            Err(err) => Self::unavailable(format!("failed to start loader thread: {err}")),
        }
    }

    /// A loader that is already resolved.
    pub const fn ready(highlighter: Arc<Highlighter>) -> Self {
        Self {
            state: LoaderState::Ready(highlighter),
        }
    }

    /// A loader that already failed.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: LoaderState::Unavailable(CapabilityError(reason.into())),
        }
    }

    /// Check for completion without blocking.
    pub fn poll(&mut self) -> Capability {
        if let LoaderState::Loading(rx) = &self.state {
            match rx.try_recv() {
                Ok(highlighter) => self.state = LoaderState::Ready(highlighter),
                Err(TryRecvError::Empty) => return Capability::Pending,
                Err(TryRecvError::Disconnected) => self.fail(),
            }
        }
        self.capability()
    }

    /// Block for at most `timeout` waiting for the load to finish.
    pub fn wait(&mut self, timeout: Duration) -> Capability {
        if let LoaderState::Loading(rx) = &self.state {
            match rx.recv_timeout(timeout) {
                Ok(highlighter) => self.state = LoaderState::Ready(highlighter),
                Err(RecvTimeoutError::Timeout) => return Capability::Pending,
                Err(RecvTimeoutError::Disconnected) => self.fail(),
            }
        }
        self.capability()
    }

    fn fail(&mut self) {
        let err = CapabilityError("highlighter thread exited without a result".to_string());
        tracing::warn!(%err, "falling back to plain code blocks");
        crate::perf::log_event("highlight.unavailable", err.to_string());
        self.state = LoaderState::Unavailable(err);
    }

    fn capability(&self) -> Capability {
        match &self.state {
            LoaderState::Loading(_) => Capability::Pending,
            LoaderState::Ready(highlighter) => Capability::Ready(Arc::clone(highlighter)),
            LoaderState::Unavailable(err) => Capability::Unavailable(err.clone()),
        }
    }
}
