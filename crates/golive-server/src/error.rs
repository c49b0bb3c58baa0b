//! Error types for the live-reload server.

use std::io;
use std::path::PathBuf;

/// Server error type.
///
/// Every variant renders as a short message meant to be shown to the
/// developer as-is.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No serving root was configured.
    #[error("No workspace folder is open to serve")]
    NoWorkspace,

    /// The serving root does not exist, is unreadable, or is not a directory.
    #[error("Cannot serve {}: {source}", path.display())]
    RootUnavailable {
        /// Configured root path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Every candidate port in the search window was taken.
    #[error("Unable to find an available port after {attempts} attempts (tried {first}-{last})")]
    PortExhausted {
        /// Preferred port the search started from.
        first: u16,
        /// Last port probed.
        last: u16,
        /// Number of ports probed.
        attempts: u16,
    },

    /// The listener could not bind the selected port.
    #[error("Failed to bind port {port}: {source}")]
    BindFailed {
        /// Port that failed to bind.
        port: u16,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// `start()` called while not stopped.
    #[error("Live server is already running")]
    AlreadyRunning,

    /// `stop()` called while not running.
    #[error("Live server is not running")]
    NotRunning,

    /// `stop()` called while another stop is in flight.
    #[error("Live server is already stopping")]
    AlreadyStopping,

    /// File watcher failure.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A file under the serving root could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The HTTP server task ended with an error during shutdown.
    #[error("Live server did not shut down cleanly: {0}")]
    ShutdownFailed(String),
}

/// File watcher error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The OS watcher could not be created or attached to the root.
    #[error("Unable to watch {} for changes: {source}", path.display())]
    Setup {
        /// Directory being watched.
        path: PathBuf,
        /// Error reported by `notify`.
        source: notify::Error,
    },

    /// The OS watcher reported an error while running.
    #[error("File watcher error: {0}")]
    Runtime(#[source] notify::Error),

    /// A configured exclude pattern is not a valid glob.
    #[error("Invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        /// Pattern as configured.
        pattern: String,
        /// Parse error.
        source: glob::PatternError,
    },

    /// Watcher setup was interrupted before the initial scan finished.
    #[error("File watcher stopped before it was ready")]
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_exhausted_message() {
        let err = ServerError::PortExhausted {
            first: 5500,
            last: 5509,
            attempts: 10,
        };

        assert_eq!(
            err.to_string(),
            "Unable to find an available port after 10 attempts (tried 5500-5509)"
        );
    }

    #[test]
    fn test_watch_error_is_transparent() {
        let err = ServerError::from(WatchError::Interrupted);
        assert_eq!(err.to_string(), "File watcher stopped before it was ready");
    }

    #[test]
    fn test_bind_failed_mentions_port() {
        let err = ServerError::BindFailed {
            port: 5501,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };

        assert!(err.to_string().starts_with("Failed to bind port 5501"));
    }
}
