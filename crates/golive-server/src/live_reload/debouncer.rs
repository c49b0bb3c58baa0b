//! Change debouncing for live reload.
//!
//! Collapses a burst of filesystem events, across any number of paths, into a
//! single batch. Every recorded event pushes one shared deadline out to
//! `now + window` (trailing edge), so the batch is released only after the
//! tree has been quiet for the whole window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change that contributed to a reload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchedChange {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Coalesced kind of change.
    pub kind: ChangeKind,
    /// When the most recent event for this path was recorded.
    pub at: Instant,
}

/// Pending change waiting for the quiet period to elapse.
struct PendingChange {
    kind: ChangeKind,
    at: Instant,
}

/// Trailing-edge debouncer with one explicit pending deadline.
///
/// Not thread-safe; owned by the watcher's debounce task.
pub(crate) struct Debouncer {
    pending: HashMap<PathBuf, PendingChange>,
    deadline: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given quiet window.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            deadline: None,
            window,
        }
    }

    /// Record an event observed at `now`, restarting the quiet window.
    pub(crate) fn record(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        use std::collections::hash_map::Entry;

        match self.pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(PendingChange { kind, at: now });
            }
            Entry::Occupied(mut entry) => {
                let pending = entry.get_mut();
                pending.kind = Self::coalesce(pending.kind, kind);
                pending.at = now;
            }
        }

        self.deadline = Some(now + self.window);
    }

    /// Coalesce two event kinds for the same path.
    ///
    /// Unlike a per-path rebuild queue, a transient file (created then removed)
    /// is still reported: the browser reload is cheap and the burst happened.
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> ChangeKind {
        use ChangeKind::{Created, Modified, Removed};

        match (existing, new) {
            (Created, Created | Modified) => Created,
            (Created, Removed) => Removed,

            (Modified, Created) => Created,
            (Modified, Modified) => Modified,
            (Modified, Removed) => Removed,

            // File was replaced
            (Removed, Created) => Modified,
            (Removed, Modified | Removed) => Removed,
        }
    }

    /// Deadline of the pending batch, if any.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Release the pending batch if its deadline has passed.
    ///
    /// Returns `None` while the window is still open or nothing is pending.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Option<Vec<WatchedChange>> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;

        let mut changes: Vec<WatchedChange> = self
            .pending
            .drain()
            .map(|(path, pending)| WatchedChange {
                path,
                kind: pending.kind,
                at: pending.at,
            })
            .collect();
        changes.sort_by(|a, b| a.path.cmp(&b.path));

        Some(changes)
    }

    /// Drop any pending batch without releasing it.
    pub(crate) fn cancel(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }
}
