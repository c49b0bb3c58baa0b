//! Server lifecycle.
//!
//! One [`ServerLifecycle`] owns at most one running server: the HTTP listener
//! with its upgrade endpoint, the change watcher, and the relay that turns
//! settled change bursts into reload broadcasts.
//!
//! ```text
//! Stopped ──start──► Starting ──ok──► Running ──stop──► Stopping ──► Stopped
//!                       │
//!                       └──error / cancelled──► Stopped
//! ```
//!
//! Transitions are serialized by one lock that is never held across an
//! `.await`. Work between transitions runs unlocked, guarded by
//! [`RevertToStopped`] so a failed or dropped future cannot leave the slot
//! stuck in `Starting` or `Stopping`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::ServerConfig;
use crate::app::create_router;
use crate::error::{ServerError, WatchError};
use crate::events::LifecycleEvents;
use crate::live_reload::{Broadcaster, ChangeWatcher, ClientMessage, ExcludeSet, WatchEvent};
use crate::port::find_available_port;
use crate::responder::StaticResponder;
use crate::state::AppState;

/// Lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Resources of one server run.
struct RunningServer {
    port: u16,
    root: PathBuf,
    started_at: Instant,
    shutdown_grace: Duration,
    broadcaster: Arc<Broadcaster>,
    watcher: Option<ChangeWatcher>,
    relay_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_task: Option<JoinHandle<io::Result<()>>>,
}

impl RunningServer {
    /// Release everything in order: watcher, clients, listener.
    async fn shutdown(&mut self) -> Result<(), ServerError> {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        if let Some(relay_task) = self.relay_task.take()
            && let Err(e) = relay_task.await
        {
            tracing::debug!(error = %e, "Reload relay ended abnormally");
        }

        let closed = self.broadcaster.close_all();
        tracing::debug!(clients = closed, "Closed reload clients");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        let Some(mut server_task) = self.server_task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_grace, &mut server_task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(ServerError::ShutdownFailed(e.to_string())),
            Ok(Err(e)) => Err(ServerError::ShutdownFailed(e.to_string())),
            Err(_) => {
                // Only the accept loop is aborted. Connections already being
                // served finish their current request on their own.
                tracing::warn!(
                    grace_ms = self.shutdown_grace.as_millis(),
                    "Stopped waiting for open connections after the grace period"
                );
                server_task.abort();
                Ok(())
            }
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(relay_task) = &self.relay_task {
            relay_task.abort();
        }
        if let Some(server_task) = &self.server_task {
            server_task.abort();
        }
    }
}

struct Slot {
    state: ServerState,
    running: Option<RunningServer>,
}

/// Puts the slot back to `Stopped` when dropped, unless completed.
struct RevertToStopped<'a> {
    slot: &'a Mutex<Slot>,
    armed: bool,
}

impl<'a> RevertToStopped<'a> {
    fn new(slot: &'a Mutex<Slot>) -> Self {
        Self { slot, armed: true }
    }

    /// Commit a successful start.
    fn complete(mut self, running: RunningServer) {
        let mut slot = self.slot.lock();
        slot.state = ServerState::Running;
        slot.running = Some(running);
        self.armed = false;
    }
}

impl Drop for RevertToStopped<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self.slot.lock();
            slot.state = ServerState::Stopped;
            slot.running = None;
        }
    }
}

/// Start/stop controller for the live-reload server.
pub struct ServerLifecycle {
    config: Mutex<ServerConfig>,
    slot: Mutex<Slot>,
    events: Arc<dyn LifecycleEvents>,
}

impl ServerLifecycle {
    /// Create a stopped lifecycle.
    pub fn new(config: ServerConfig, events: Arc<dyn LifecycleEvents>) -> Self {
        Self {
            config: Mutex::new(config),
            slot: Mutex::new(Slot {
                state: ServerState::Stopped,
                running: None,
            }),
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> ServerState {
        self.slot.lock().state
    }

    /// Port of the running server.
    pub fn port(&self) -> Option<u16> {
        self.slot.lock().running.as_ref().map(|running| running.port)
    }

    /// Canonical serving root of the running server.
    pub fn root(&self) -> Option<PathBuf> {
        self.slot
            .lock()
            .running
            .as_ref()
            .map(|running| running.root.clone())
    }

    /// Number of connected reload clients.
    pub fn client_count(&self) -> usize {
        self.slot
            .lock()
            .running
            .as_ref()
            .map_or(0, |running| running.broadcaster.client_count())
    }

    /// Configuration used by the next start.
    pub fn config(&self) -> ServerConfig {
        self.config.lock().clone()
    }

    /// Replace the configuration. A running server keeps its settings until
    /// it is restarted.
    pub fn update_config(&self, config: ServerConfig) {
        *self.config.lock() = config;
    }

    /// Start serving and return the bound port.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] unless stopped. Any other error
    /// means the start was rolled back and the lifecycle is stopped again.
    pub async fn start(&self) -> Result<u16, ServerError> {
        {
            let mut slot = self.slot.lock();
            if slot.state != ServerState::Stopped {
                return Err(ServerError::AlreadyRunning);
            }
            slot.state = ServerState::Starting;
        }
        let guard = RevertToStopped::new(&self.slot);
        let config = self.config();

        match self.launch(&config).await {
            Ok(running) => {
                let port = running.port;
                tracing::info!(
                    port,
                    root = %running.root.display(),
                    live_reload = running.watcher.is_some(),
                    "Live server started"
                );
                guard.complete(running);
                self.events.started(port);
                Ok(port)
            }
            Err(e) => {
                drop(guard);
                tracing::warn!(error = %e, "Live server failed to start");
                self.events.start_failed(&e);
                Err(e)
            }
        }
    }

    /// Stop serving.
    ///
    /// The lifecycle always ends stopped; an error means shutdown was not
    /// clean.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotRunning`] or [`ServerError::AlreadyStopping`]
    /// without side effects, or [`ServerError::ShutdownFailed`].
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut running = {
            let mut slot = self.slot.lock();
            match slot.state {
                ServerState::Running => {}
                ServerState::Stopping => return Err(ServerError::AlreadyStopping),
                ServerState::Stopped | ServerState::Starting => {
                    return Err(ServerError::NotRunning);
                }
            }
            let Some(running) = slot.running.take() else {
                slot.state = ServerState::Stopped;
                return Err(ServerError::NotRunning);
            };
            slot.state = ServerState::Stopping;
            running
        };
        let stopped = RevertToStopped::new(&self.slot);

        let result = running.shutdown().await;
        let uptime = running.started_at.elapsed();
        let port = running.port;
        drop(running);
        drop(stopped);

        match result {
            Ok(()) => {
                tracing::info!(port, uptime_secs = uptime.as_secs(), "Live server stopped");
                self.events.stopped(uptime);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(port, error = %e, "Live server stopped with errors");
                self.events.stop_failed(&e);
                Err(e)
            }
        }
    }

    /// Open every resource of a run. Nothing outlives a failed launch.
    async fn launch(&self, config: &ServerConfig) -> Result<RunningServer, ServerError> {
        let root = resolve_root(config.root.as_deref()).await?;
        let port = find_available_port(&config.host, config.port, config.port_attempts)?;

        let listener = TcpListener::bind((config.host.as_str(), port))
            .await
            .map_err(|source| ServerError::BindFailed { port, source })?;
        let port = listener
            .local_addr()
            .map_err(|source| ServerError::BindFailed { port, source })?
            .port();

        let broadcaster = Arc::new(Broadcaster::new());

        let (watcher, watch_events) = if config.live_reload_enabled {
            match start_watcher(&root, config).await {
                Ok((watcher, watch_events)) => (Some(watcher), Some(watch_events)),
                Err(e) => {
                    tracing::warn!(error = %e, "Serving without live reload");
                    self.events.watch_error(&e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };
        let live_reload = watcher.is_some();

        let state = Arc::new(AppState {
            responder: StaticResponder::new(root.clone(), live_reload.then_some(port)),
            broadcaster: Arc::clone(&broadcaster),
            live_reload,
        });
        let app = create_router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let relay_task = watch_events.map(|watch_events| {
            tokio::spawn(relay_changes(
                watch_events,
                Arc::clone(&broadcaster),
                Arc::clone(&self.events),
            ))
        });

        Ok(RunningServer {
            port,
            root,
            started_at: Instant::now(),
            shutdown_grace: config.shutdown_grace,
            broadcaster,
            watcher,
            relay_task,
            shutdown_tx: Some(shutdown_tx),
            server_task: Some(server_task),
        })
    }
}

/// Canonicalize the serving root and check it is a readable directory.
async fn resolve_root(root: Option<&Path>) -> Result<PathBuf, ServerError> {
    let root = root.ok_or(ServerError::NoWorkspace)?;
    let unavailable = |source: io::Error| ServerError::RootUnavailable {
        path: root.to_path_buf(),
        source,
    };

    let resolved = tokio::fs::canonicalize(root).await.map_err(unavailable)?;
    let metadata = tokio::fs::metadata(&resolved).await.map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    // Opened only to prove the directory is readable
    drop(tokio::fs::read_dir(&resolved).await.map_err(unavailable)?);

    Ok(resolved)
}

async fn start_watcher(
    root: &Path,
    config: &ServerConfig,
) -> Result<(ChangeWatcher, mpsc::UnboundedReceiver<WatchEvent>), WatchError> {
    let exclude = ExcludeSet::new(&config.exclude)?;
    ChangeWatcher::start(
        root.to_path_buf(),
        exclude,
        Duration::from_millis(config.debounce_ms),
    )
    .await
}

/// Turn settled change bursts into reload broadcasts.
async fn relay_changes(
    mut watch_events: mpsc::UnboundedReceiver<WatchEvent>,
    broadcaster: Arc<Broadcaster>,
    events: Arc<dyn LifecycleEvents>,
) {
    let mut error_reported = false;

    while let Some(event) = watch_events.recv().await {
        match event {
            WatchEvent::Reload(changes) => {
                let clients = broadcaster.broadcast(ClientMessage::Reload);
                tracing::info!(changes = changes.len(), clients, "Reload broadcast");
                events.reloaded(&changes, clients);
            }
            WatchEvent::Error(error) => {
                if !error_reported {
                    error_reported = true;
                    events.watch_error(&error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::live_reload::WatchedChange;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn log(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    impl LifecycleEvents for Recorder {
        fn started(&self, port: u16) {
            self.log.lock().push(format!("started:{port}"));
        }

        fn start_failed(&self, error: &ServerError) {
            self.log.lock().push(format!("start_failed:{error}"));
        }

        fn stopped(&self, _uptime: Duration) {
            self.log.lock().push("stopped".to_owned());
        }

        fn stop_failed(&self, error: &ServerError) {
            self.log.lock().push(format!("stop_failed:{error}"));
        }

        fn watch_error(&self, error: &WatchError) {
            self.log.lock().push(format!("watch_error:{error}"));
        }

        fn reloaded(&self, _changes: &[WatchedChange], clients: usize) {
            self.log.lock().push(format!("reloaded:{clients}"));
        }
    }

    fn config_for(root: &Path) -> ServerConfig {
        ServerConfig {
            port: free_port(),
            root: Some(root.to_path_buf()),
            ..ServerConfig::default()
        }
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    fn lifecycle(config: ServerConfig) -> (ServerLifecycle, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let events: Arc<dyn LifecycleEvents> = Arc::clone(&recorder) as Arc<dyn LifecycleEvents>;
        (ServerLifecycle::new(config, events), recorder)
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));

        let port = lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state(), ServerState::Running);
        assert_eq!(lifecycle.port(), Some(port));
        assert_eq!(lifecycle.root(), Some(temp.path().canonicalize().unwrap()));

        lifecycle.stop().await.unwrap();
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(lifecycle.port(), None);
        assert_eq!(recorder.log(), vec![format!("started:{port}"), "stopped".to_owned()]);

        // Port is released
        std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_stopped_has_no_side_effects() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));

        let err = lifecycle.stop().await.unwrap_err();

        assert!(matches!(err, ServerError::NotRunning));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert!(recorder.log().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_starts_yield_one_server() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));

        let (first, second) = tokio::join!(lifecycle.start(), lifecycle.start());

        let (port, rejected) = match (first, second) {
            (Ok(port), Err(e)) | (Err(e), Ok(port)) => (port, e),
            other => panic!("expected one success and one rejection, got {other:?}"),
        };
        assert!(matches!(rejected, ServerError::AlreadyRunning));
        assert_eq!(lifecycle.port(), Some(port));
        assert_eq!(recorder.log(), vec![format!("started:{port}")]);

        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, _recorder) = lifecycle(config_for(temp.path()));

        let port = lifecycle.start().await.unwrap();
        let err = lifecycle.start().await.unwrap_err();

        assert!(matches!(err, ServerError::AlreadyRunning));
        assert_eq!(lifecycle.port(), Some(port));
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_workspace() {
        let (lifecycle, recorder) = lifecycle(ServerConfig::default());

        let err = lifecycle.start().await.unwrap_err();

        assert!(matches!(err, ServerError::NoWorkspace));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(
            recorder.log(),
            vec!["start_failed:No workspace folder is open to serve".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, _recorder) = lifecycle(config_for(&temp.path().join("missing")));

        let err = lifecycle.start().await.unwrap_err();

        assert!(matches!(err, ServerError::RootUnavailable { .. }));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_file_root_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("index.html");
        fs::write(&file, "<p>hi</p>").unwrap();
        let (lifecycle, _recorder) = lifecycle(config_for(&file));

        let err = lifecycle.start().await.unwrap_err();

        assert!(matches!(err, ServerError::RootUnavailable { .. }));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_port_exhausted_rolls_back() {
        let temp = tempfile::tempdir().unwrap();
        let occupied = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = occupied.local_addr().unwrap().port();
        let config = ServerConfig {
            port,
            port_attempts: 1,
            ..config_for(temp.path())
        };
        let (lifecycle, recorder) = lifecycle(config);

        let err = lifecycle.start().await.unwrap_err();

        assert!(matches!(err, ServerError::PortExhausted { .. }));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(recorder.log().len(), 1);
        assert!(recorder.log()[0].starts_with("start_failed:Unable to find an available port"));
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, _recorder) = lifecycle(config_for(temp.path()));

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state(), ServerState::Running);
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_config_applies_on_next_start() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, _recorder) = lifecycle(config_for(temp.path()));

        let first = lifecycle.start().await.unwrap();
        let next_port = free_port();
        lifecycle.update_config(ServerConfig {
            port: next_port,
            ..config_for(temp.path())
        });
        assert_eq!(lifecycle.port(), Some(first));

        lifecycle.stop().await.unwrap();
        let second = lifecycle.start().await.unwrap();
        assert_eq!(second, next_port);
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_start_reverts_to_stopped() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));

        let mut start = Box::pin(lifecycle.start());
        let finished = tokio::select! {
            biased;
            result = &mut start => Some(result),
            () = std::future::ready(()) => None,
        };
        if finished.is_some() {
            // Finished in a single poll, nothing to cancel
            drop(start);
            lifecycle.stop().await.unwrap();
            return;
        }
        assert_eq!(lifecycle.state(), ServerState::Starting);

        drop(start);
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert!(recorder.log().is_empty());

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_without_live_reload() {
        let temp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            live_reload_enabled: false,
            ..config_for(temp.path())
        };
        let (lifecycle, recorder) = lifecycle(config);

        lifecycle.start().await.unwrap();
        fs::write(temp.path().join("index.html"), "x").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        lifecycle.stop().await.unwrap();

        assert!(!recorder.log().iter().any(|line| line.starts_with("reloaded")));
    }

    #[tokio::test]
    async fn test_watcher_failure_keeps_serving() {
        let temp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            exclude: vec!["[bad".to_owned()],
            ..config_for(temp.path())
        };
        let (lifecycle, recorder) = lifecycle(config);

        let port = lifecycle.start().await.unwrap();

        assert_eq!(lifecycle.state(), ServerState::Running);
        let log = recorder.log();
        assert_eq!(log.len(), 2, "unexpected events: {log:?}");
        assert!(log[0].starts_with("watch_error:Invalid exclude pattern \"[bad\""));
        assert_eq!(log[1], format!("started:{port}"));

        // Changes are not relayed and the error is not repeated
        fs::write(temp.path().join("index.html"), "<p>v1</p>").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        lifecycle.stop().await.unwrap();

        let log = recorder.log();
        assert_eq!(
            log.iter().filter(|line| line.starts_with("watch_error:")).count(),
            1
        );
        assert!(!log.iter().any(|line| line.starts_with("reloaded")));
    }

    #[tokio::test]
    async fn test_concurrent_stops_stop_once() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));
        let port = lifecycle.start().await.unwrap();

        let (first, second) = tokio::join!(lifecycle.stop(), lifecycle.stop());

        let rejected = match (first, second) {
            (Ok(()), Err(e)) | (Err(e), Ok(())) => e,
            other => panic!("expected one success and one rejection, got {other:?}"),
        };
        assert!(matches!(
            rejected,
            ServerError::NotRunning | ServerError::AlreadyStopping
        ));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(recorder.log(), vec![format!("started:{port}"), "stopped".to_owned()]);
    }

    #[tokio::test]
    async fn test_stop_while_stopping_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));
        let port = lifecycle.start().await.unwrap();

        // On the single-threaded test runtime the first poll parks on the
        // debounce task, which cannot run until this task yields
        let mut first = Box::pin(lifecycle.stop());
        let pending = tokio::select! {
            biased;
            _ = &mut first => false,
            () = std::future::ready(()) => true,
        };
        assert!(pending);
        assert_eq!(lifecycle.state(), ServerState::Stopping);

        let err = lifecycle.stop().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyStopping));
        assert_eq!(lifecycle.state(), ServerState::Stopping);

        first.await.unwrap();
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(recorder.log(), vec![format!("started:{port}"), "stopped".to_owned()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_gives_up_on_stalled_connection() {
        use std::io::Write;

        let temp = tempfile::tempdir().unwrap();
        // Larger than the socket buffers, so the response cannot complete
        // while the client never reads
        fs::write(temp.path().join("large.bin"), vec![0_u8; 32 * 1024 * 1024]).unwrap();
        let config = ServerConfig {
            live_reload_enabled: false,
            shutdown_grace: Duration::from_millis(200),
            ..config_for(temp.path())
        };
        let (lifecycle, recorder) = lifecycle(config);
        let port = lifecycle.start().await.unwrap();

        let mut stalled = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        stalled
            .write_all(b"GET /large.bin HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let begun = Instant::now();
        lifecycle.stop().await.unwrap();

        assert!(begun.elapsed() >= Duration::from_millis(200));
        assert!(begun.elapsed() < Duration::from_secs(2));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
        assert_eq!(recorder.log(), vec![format!("started:{port}"), "stopped".to_owned()]);
        drop(stalled);
    }

    #[tokio::test]
    async fn test_reload_reported_after_change() {
        let temp = tempfile::tempdir().unwrap();
        let (lifecycle, recorder) = lifecycle(config_for(temp.path()));
        lifecycle.start().await.unwrap();

        fs::write(temp.path().join("index.html"), "<p>v1</p>").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !recorder.log().iter().any(|line| line == "reloaded:0") {
            assert!(tokio::time::Instant::now() < deadline, "no reload reported");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        lifecycle.stop().await.unwrap();
    }
}
