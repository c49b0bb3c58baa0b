//! Live-reload static file server.
//!
//! Serves a directory over HTTP and refreshes connected browser tabs when
//! files under it change:
//! - Static files with MIME types, gzip, and hardening headers
//! - A reload client injected into every HTML response
//! - A WebSocket endpoint on the same port pushing `"reload"` frames
//! - A debounced recursive file watcher driving those frames
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use golive_server::{NoopEvents, ServerConfig, ServerLifecycle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         root: Some(PathBuf::from("public")),
//!         ..ServerConfig::default()
//!     };
//!
//!     let lifecycle = ServerLifecycle::new(config, Arc::new(NoopEvents));
//!     let port = lifecycle.start().await.unwrap();
//!     println!("http://localhost:{port}");
//!
//!     tokio::signal::ctrl_c().await.unwrap();
//!     lifecycle.stop().await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum fallback handler
//!    ▲                   │
//!    │                   ├─► StaticResponder ──► inject (HTML only)
//!    │                   │
//!    │                   └─► WebSocket upgrade ──► Broadcaster
//!    │                                                 ▲
//!    └────────────── "reload" ◄────────────────────────┤
//!                                                      │
//!            notify ──► ExcludeSet ──► Debouncer ──► relay (ServerLifecycle)
//! ```

mod app;
mod error;
mod events;
mod inject;
mod lifecycle;
mod live_reload;
mod middleware;
mod pages;
mod port;
mod responder;
mod state;

use std::path::PathBuf;
use std::time::Duration;

pub use error::{ServerError, WatchError};
pub use events::{LifecycleEvents, NoopEvents};
pub use inject::inject;
pub use lifecycle::{ServerLifecycle, ServerState};
pub use live_reload::{
    Broadcaster, ChangeKind, ChangeWatcher, ClientId, ClientMessage, ExcludeSet, WatchEvent,
    WatchedChange,
};
pub use port::find_available_port;
pub use responder::{Reply, StaticResponder};

/// Default grace period for open connections on stop.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Server configuration.
///
/// Read once per start; see [`ServerLifecycle::update_config`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Preferred port; the first free port at or after it is used.
    pub port: u16,
    /// Number of consecutive ports to try.
    pub port_attempts: u16,
    /// Directory to serve (`None` when no workspace is open).
    pub root: Option<PathBuf>,
    /// Enable live reload.
    pub live_reload_enabled: bool,
    /// Quiet period before a change burst triggers a reload.
    pub debounce_ms: u64,
    /// Extra glob patterns ignored by the watcher.
    pub exclude: Vec<String>,
    /// How long open connections may linger on stop.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5500,
            port_attempts: 10,
            root: None,
            live_reload_enabled: true,
            debounce_ms: 100,
            exclude: Vec::new(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl From<&golive_config::Config> for ServerConfig {
    fn from(config: &golive_config::Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            port_attempts: config.server.port_attempts,
            root: Some(config.root_resolved.clone()),
            live_reload_enabled: config.live_reload.enabled,
            debounce_ms: config.live_reload.debounce_ms,
            exclude: config.live_reload.exclude.clone(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
