//! Logging setup and server startup for SocketHub.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use sockethub_config::{Config, ConfigLoader};
use sockethub_runloop::{RunLoop, TopicPeriodicTimer};
use sockethub_server::{EventDispatcher, ServerOptions, TopicApplication, WebSocketServer};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when `directory` is set, a
/// daily rolling log file.
///
/// `RUST_LOG` takes precedence over `level`.
pub(crate) fn init_tracing(level: &str, format: LogFormat, directory: Option<&str>) -> anyhow::Result<()> {
    let file_layer = match directory {
        Some(dir) => {
            let log_dir = PathBuf::from(ConfigLoader::expand_path(dir));
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("sockethub")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(fmt::layer().with_target(true).with_ansi(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Run the server in foreground until Ctrl-C.
pub(crate) async fn run_server(config: Config, host: String, port: u16, profile: bool) -> anyhow::Result<()> {
    info!("SocketHub v{}", env!("CARGO_PKG_VERSION"));

    let run_loop = Arc::new(RunLoop::default());
    let events = Arc::new(EventDispatcher::new());
    let options = ServerOptions::from_config(&config);
    let topic_timers = Arc::new(TopicPeriodicTimer::new(run_loop.clone(), options.topic_timers));
    let application = Arc::new(TopicApplication::new(topic_timers, events.clone()));

    let mut server = WebSocketServer::new(options, run_loop.clone(), events, application);
    for origin in &config.origins.allowed {
        server.add_origin(origin.clone());
    }

    let stopper = run_loop.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        stopper.stop();
    });

    server.launch(&host, port, profile).await?;
    Ok(())
}
