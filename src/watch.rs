//! Re-render a document whenever it changes on disk
//!
//! Editors tend to emit bursts of events for one save (truncate, write,
//! rename), so events are coalesced: a render happens once the file has been
//! quiet for the configured debounce window.

use crate::config::Config;
use crate::error::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Trailing-edge debounce: fires once `window` has passed since the last event
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_event: None,
        }
    }

    /// Record an event, restarting the quiet period
    pub fn touch(&mut self, now: Instant) {
        self.last_event = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// Time left before firing, `None` when nothing is pending
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.last_event
            .map(|last| (last + self.window).saturating_duration_since(now))
    }

    /// Whether the quiet period is over; clears the pending event when it is
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.remaining(now) {
            Some(left) if left.is_zero() => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// Watch a markdown document and hand every rendering to `on_render`
///
/// The document is rendered once up front and again after each debounced
/// change. Returning `ControlFlow::Break` from the callback stops watching.
pub fn watch_document<P, F>(path: P, config: &Config, mut on_render: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(Result<String>) -> ControlFlow<()>,
{
    let path = path.as_ref().canonicalize()?;
    let options = config.render_options();
    let render = |path: &Path| crate::render_file(path, &options);

    if on_render(render(&path)).is_break() {
        return Ok(());
    }

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;

    // Watch the directory: saving often replaces the file rather than writing it.
    let directory = watched_directory(&path);
    watcher.watch(&directory, RecursiveMode::NonRecursive)?;
    debug!(path = %path.display(), debounce = ?config.watch.debounce(), "watching");

    let mut debouncer = Debouncer::new(config.watch.debounce());
    loop {
        let received = match debouncer.remaining(Instant::now()) {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Ok(event)) => {
                if is_change_to(&event, &path) {
                    debouncer.touch(Instant::now());
                }
            }
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if debouncer.fire(Instant::now()) {
            debug!(path = %path.display(), "re-rendering");
            if on_render(render(&path)).is_break() {
                break;
            }
        }
    }

    Ok(())
}

fn watched_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Only creations and modifications of the watched file itself count
fn is_change_to(event: &Event, path: &Path) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|changed| changed.file_name() == path.file_name())
}
