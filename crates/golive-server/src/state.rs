//! Application state.
//!
//! Shared state for the request handler of one server run.

use std::sync::Arc;

use crate::live_reload::Broadcaster;
use crate::responder::StaticResponder;

/// Application state shared across all requests.
pub(crate) struct AppState {
    /// Resolves request paths against the serving root.
    pub(crate) responder: StaticResponder,
    /// Reload client registry.
    pub(crate) broadcaster: Arc<Broadcaster>,
    /// Whether upgrade requests are accepted.
    pub(crate) live_reload: bool,
}

impl AppState {
    /// Check if live reload is enabled.
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.live_reload && !self.broadcaster.is_closed()
    }
}
