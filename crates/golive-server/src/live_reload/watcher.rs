//! Recursive file watcher feeding the live reload pipeline.
//!
//! Raw `notify` events are filtered through the [`ExcludeSet`], fed into a
//! [`Debouncer`], and released as one [`WatchEvent::Reload`] per burst.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::debouncer::{ChangeKind, Debouncer, WatchedChange};
use super::exclude::ExcludeSet;
use crate::error::WatchError;

/// Signal pushed by the watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// A debounced burst of changes settled.
    Reload(Vec<WatchedChange>),
    /// The OS watcher reported an error. Watching continues.
    Error(WatchError),
}

/// Running recursive watch over a serving root.
///
/// Dropping the watcher aborts the debounce task; [`ChangeWatcher::stop`]
/// shuts it down in order.
pub struct ChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    watched_files: usize,
}

impl ChangeWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns once the OS watch is registered and the initial scan of the
    /// tree has finished. Events observed before that point are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Setup`] if the OS watcher cannot be created or
    /// attached, and [`WatchError::Interrupted`] if setup was cancelled.
    pub async fn start(
        root: PathBuf,
        exclude: ExcludeSet,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), WatchError> {
        let ready = Arc::new(AtomicBool::new(false));
        let exclude = Arc::new(exclude);
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let gate = Arc::clone(&ready);
        let setup_root = root.clone();
        let setup_exclude = Arc::clone(&exclude);
        let (watcher, watched_files) = tokio::task::spawn_blocking(move || {
            let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                // Errors bypass the gate so setup problems are not lost
                if res.is_err() || gate.load(Ordering::Acquire) {
                    let _ = raw_tx.send(res);
                }
            })
            .map_err(|source| WatchError::Setup {
                path: setup_root.clone(),
                source,
            })?;

            watcher
                .watch(&setup_root, RecursiveMode::Recursive)
                .map_err(|source| WatchError::Setup {
                    path: setup_root.clone(),
                    source,
                })?;

            let watched_files = count_watched_files(&setup_root, &setup_root, &setup_exclude);
            Ok::<_, WatchError>((watcher, watched_files))
        })
        .await
        .map_err(|_| WatchError::Interrupted)??;

        ready.store(true, Ordering::Release);
        tracing::info!(root = %root.display(), watched_files, "File watcher ready");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_debounce(
            root,
            exclude,
            Debouncer::new(debounce),
            raw_rx,
            stop_rx,
            events_tx,
        ));

        let change_watcher = Self {
            watcher: Some(watcher),
            stop_tx: Some(stop_tx),
            task: Some(task),
            watched_files,
        };
        Ok((change_watcher, events_rx))
    }

    /// Number of non-excluded files found by the initial scan.
    #[must_use]
    pub fn watched_files(&self) -> usize {
        self.watched_files
    }

    /// Stop watching.
    ///
    /// Detaches the OS watcher, discards any pending batch, and waits for the
    /// debounce task to finish. No [`WatchEvent`] is sent afterwards.
    pub async fn stop(mut self) {
        drop(self.watcher.take());
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::debug!(error = %e, "Debounce task ended abnormally");
        }
        tracing::debug!("File watcher stopped");
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Debounce loop: records accepted events and releases settled batches.
async fn run_debounce(
    root: PathBuf,
    exclude: Arc<ExcludeSet>,
    mut debouncer: Debouncer,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut stop_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<WatchEvent>,
) {
    loop {
        let deadline = debouncer.next_deadline();

        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                debouncer.cancel();
                break;
            }
            raw = raw_rx.recv() => match raw {
                Some(Ok(event)) => record_event(&event, &root, &exclude, &mut debouncer),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "File watcher error");
                    if events.send(WatchEvent::Error(WatchError::Runtime(e))).is_err() {
                        break;
                    }
                }
                None => break,
            },
            () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(changes) = debouncer.drain_ready(Instant::now()) {
                    tracing::debug!(changes = changes.len(), "Change burst settled");
                    if events.send(WatchEvent::Reload(changes)).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Record a raw filesystem event into the debouncer.
fn record_event(event: &Event, root: &Path, exclude: &ExcludeSet, debouncer: &mut Debouncer) {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return,
    };

    let now = Instant::now();
    for path in &event.paths {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.as_os_str().is_empty() || exclude.is_excluded(relative) {
            continue;
        }

        debouncer.record(path.clone(), kind, now);
        tracing::debug!(path = %path.display(), ?kind, "Recorded filesystem event");
    }
}

/// Count non-excluded files below `dir`.
fn count_watched_files(root: &Path, dir: &Path, exclude: &ExcludeSet) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if exclude.is_excluded(relative) {
            continue;
        }

        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => {
                count += count_watched_files(root, &path, exclude);
            }
            Ok(_) => count += 1,
            Err(_) => {}
        }
    }
    count
}
