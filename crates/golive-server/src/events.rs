//! Lifecycle notifications for the embedding application.

use std::time::Duration;

use crate::error::{ServerError, WatchError};
use crate::live_reload::WatchedChange;

/// Sink for lifecycle notifications.
///
/// The server never talks to a UI directly; whatever embeds it (a CLI, an
/// editor extension, a status bar) implements this trait. Every method has a
/// no-op default. Calls happen on runtime worker threads and must not block.
pub trait LifecycleEvents: Send + Sync {
    /// The server is accepting connections on `port`.
    fn started(&self, port: u16) {
        let _ = port;
    }

    /// A start attempt failed and everything it opened was released.
    fn start_failed(&self, error: &ServerError) {
        let _ = error;
    }

    /// The server stopped cleanly after running for `uptime`.
    fn stopped(&self, uptime: Duration) {
        let _ = uptime;
    }

    /// The server stopped, but shutdown reported an error.
    fn stop_failed(&self, error: &ServerError) {
        let _ = error;
    }

    /// File watching failed; serving continues without live reload.
    ///
    /// Reported at most once per run.
    fn watch_error(&self, error: &WatchError) {
        let _ = error;
    }

    /// A reload was broadcast to `clients` connected browsers.
    fn reloaded(&self, changes: &[WatchedChange], clients: usize) {
        let _ = (changes, clients);
    }
}

/// Events sink that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEvents;

impl LifecycleEvents for NoopEvents {}
