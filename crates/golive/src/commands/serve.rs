//! `golive serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use golive_config::{CliSettings, Config};
use golive_server::{ServerConfig, ServerLifecycle};

use crate::error::CliError;
use crate::events::ConsoleEvents;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover golive.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Preferred port (overrides config). The next free port is used if taken.
    #[arg(short, long, env = "GOLIVE_PORT")]
    port: Option<u16>,

    /// Enable verbose output (lifecycle and file event logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// Runs until Ctrl-C, then stops the server.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            live_reload_enabled: self.resolve_live_reload_enabled(),
            host: self.host,
            port: self.port,
            root: self.root,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.field("Root", &config.root_resolved.display().to_string());
        if let Some(path) = &config.config_path {
            output.field("Config", &path.display().to_string());
        }
        output.field(
            "Live reload",
            if config.live_reload.enabled {
                "enabled"
            } else {
                "disabled"
            },
        );

        let server_config = ServerConfig::from(&config);
        let lifecycle = ServerLifecycle::new(server_config, Arc::new(ConsoleEvents::new()));

        let port = lifecycle.start().await?;
        output.url(&format!("http://localhost:{port}/"));
        output.detail("Press Ctrl-C to stop");

        serve_until(&lifecycle, tokio::signal::ctrl_c()).await
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

/// Wait for `shutdown`, then stop the server.
///
/// The server is stopped even when waiting for the signal fails.
async fn serve_until(
    lifecycle: &ServerLifecycle,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> Result<(), CliError> {
    let signal = shutdown.await;
    match &signal {
        Ok(()) => tracing::info!("Shutdown signal received, stopping server..."),
        Err(e) => tracing::warn!(error = %e, "Cannot wait for Ctrl-C, stopping server..."),
    }

    lifecycle.stop().await?;
    signal?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use golive_server::{NoopEvents, ServerState};

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let argv = std::iter::once("serve").chain(args.iter().copied());
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_live_reload_defaults_to_config() {
        assert_eq!(parse(&[]).resolve_live_reload_enabled(), None);
    }

    #[test]
    fn test_no_live_reload() {
        assert_eq!(
            parse(&["--no-live-reload"]).resolve_live_reload_enabled(),
            Some(false)
        );
    }

    #[test]
    fn test_explicit_live_reload() {
        assert_eq!(
            parse(&["--live-reload", "true"]).resolve_live_reload_enabled(),
            Some(true)
        );
    }

    #[test]
    fn test_overrides() {
        let args = parse(&["-r", "public", "--host", "0.0.0.0", "-p", "8000"]);

        assert_eq!(args.root, Some(PathBuf::from("public")));
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(8000));
        assert!(!args.verbose);
    }

    fn lifecycle_for(root: &std::path::Path) -> ServerLifecycle {
        let port = std::net::TcpListener::bind(("127.0.0.1", 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = ServerConfig {
            port,
            root: Some(root.to_path_buf()),
            live_reload_enabled: false,
            ..ServerConfig::default()
        };
        ServerLifecycle::new(config, Arc::new(NoopEvents))
    }

    #[tokio::test]
    async fn test_serve_until_stops_on_signal() {
        let temp = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_for(temp.path());
        lifecycle.start().await.unwrap();

        serve_until(&lifecycle, async { Ok(()) }).await.unwrap();

        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_serve_until_stops_when_signal_fails() {
        let temp = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_for(temp.path());
        lifecycle.start().await.unwrap();

        let result = serve_until(&lifecycle, async {
            Err(std::io::Error::other("no signal handler"))
        })
        .await;

        assert!(matches!(result, Err(CliError::Io(_))));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_serve_until_reports_stop_errors_once() {
        let temp = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_for(temp.path());

        // Not started: the stop error is returned to the caller, which is
        // the only place it gets printed
        let result = serve_until(&lifecycle, async { Ok(()) }).await;

        assert!(matches!(
            result,
            Err(CliError::Server(golive_server::ServerError::NotRunning))
        ));
    }
}
