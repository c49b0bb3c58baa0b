//! Terminal rendering of server lifecycle events.

use std::time::Duration;

use golive_server::{LifecycleEvents, WatchError, WatchedChange};

use crate::output::Output;

/// Prints lifecycle events to stderr.
///
/// Start and stop failures are not printed here. They come back from
/// `start()` and `stop()` and are reported once by `main`.
pub(crate) struct ConsoleEvents {
    output: Output,
}

impl ConsoleEvents {
    pub(crate) fn new() -> Self {
        Self {
            output: Output::new(),
        }
    }
}

impl LifecycleEvents for ConsoleEvents {
    fn started(&self, port: u16) {
        self.output.success(&format!("Live server started on port {port}"));
    }

    fn stopped(&self, uptime: Duration) {
        self.output
            .success(&format!("Live server stopped after {}", format_uptime(uptime)));
    }

    fn watch_error(&self, error: &WatchError) {
        self.output
            .warning(&format!("Live reload unavailable: {error}"));
    }

    fn reloaded(&self, changes: &[WatchedChange], clients: usize) {
        let noun = if clients == 1 { "browser" } else { "browsers" };
        self.output.detail(&format!(
            "Reloaded {clients} {noun} ({} changed)",
            changes.len()
        ));
    }
}

/// Format an uptime as `1h 2m 3s`, dropping leading zero units.
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_millis(900)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3600 + 61)), "1h 1m 1s");
    }
}
