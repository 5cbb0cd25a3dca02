//! Cancellable file-system subscription yielding typed watch events.
//!
//! Raw notifications are collected on the notify thread and handed to the
//! async side over a channel. [`SourceWatcher::next`] waits for the settle
//! window to elapse without new notifications, coalesces what arrived per
//! path and then yields the events in order of first appearance.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Default settle window between a detected change and its delivery.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Kind of change observed under the watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File or directory appeared.
    Added,
    /// File contents or metadata changed.
    Changed,
    /// File or directory disappeared.
    Removed,
}

/// A single change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Recursive subscription on a directory.
///
/// Pre-existing files produce no events; only changes made after
/// [`SourceWatcher::subscribe`] returns are reported. Dropping the watcher or
/// calling [`SourceWatcher::unsubscribe`] stops notifications.
pub struct SourceWatcher {
    /// Underlying notify watcher, kept alive for the subscription lifetime
    _watcher: RecommendedWatcher,
    root: PathBuf,
    settle: Duration,
    raw_rx: mpsc::UnboundedReceiver<WatchEvent>,
    pending: VecDeque<WatchEvent>,
}

impl SourceWatcher {
    /// Subscribe to changes under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceRootMissing`] if `root` does not exist, or a
    /// watch error if the notification backend cannot be initialised.
    pub fn subscribe(root: impl Into<PathBuf>, settle: Duration) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(Error::SourceRootMissing(root));
        }
        // notify reports absolute paths; keep the root comparable.
        let root = root.canonicalize()?;

        let (tx, raw_rx) = mpsc::unbounded_channel();
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for change in classify(&event) {
                        if !change.path.starts_with(&root_clone) {
                            continue;
                        }
                        // Receiver gone means the subscription was dropped.
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::warn!("file watcher error: {}", e),
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!("watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            root,
            settle,
            raw_rx,
            pending: VecDeque::new(),
        })
    }

    /// Wait for the next settled event.
    ///
    /// Returns `None` once the subscription has been torn down.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let first = self.raw_rx.recv().await?;
        let mut batch = vec![first];

        // Keep collecting until the tree has been quiet for a full window.
        loop {
            match tokio::time::timeout(self.settle, self.raw_rx.recv()).await {
                Ok(Some(event)) => batch.push(event),
                Ok(None) | Err(_) => break,
            }
        }

        self.pending = coalesce(batch);
        self.pending.pop_front()
    }

    /// Root directory being watched (canonicalized).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        tracing::debug!("stopped watching {}", self.root.display());
    }
}

/// Convert a notify event into zero or more typed events.
fn classify(event: &Event) -> Vec<WatchEvent> {
    use WatchEventKind::*;

    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| WatchEvent::new(Added, p))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|p| WatchEvent::new(Removed, p))
            .collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event
                .paths
                .iter()
                .map(|p| WatchEvent::new(Removed, p))
                .collect(),
            RenameMode::To => event
                .paths
                .iter()
                .map(|p| WatchEvent::new(Added, p))
                .collect(),
            RenameMode::Both if event.paths.len() == 2 => vec![
                WatchEvent::new(Removed, &event.paths[0]),
                WatchEvent::new(Added, &event.paths[1]),
            ],
            // Unknown rename direction: decide from what is on disk now.
            _ => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() { Added } else { Removed };
                    WatchEvent::new(kind, p)
                })
                .collect(),
        },
        EventKind::Modify(_) => event
            .paths
            .iter()
            .map(|p| WatchEvent::new(Changed, p))
            .collect(),
        _ => Vec::new(),
    }
}

/// Merge a burst of raw events into one event per path.
///
/// The last kind observed for a path wins, except that a change following an
/// addition is still reported as an addition.
fn coalesce(batch: Vec<WatchEvent>) -> VecDeque<WatchEvent> {
    let mut merged: Vec<WatchEvent> = Vec::with_capacity(batch.len());

    for event in batch {
        match merged.iter_mut().find(|e| e.path == event.path) {
            Some(existing) => {
                existing.kind = match (existing.kind, event.kind) {
                    (WatchEventKind::Added, WatchEventKind::Changed) => WatchEventKind::Added,
                    (_, kind) => kind,
                };
            }
            None => merged.push(event),
        }
    }

    merged.into()
}
