//! SocketHub - WebSocket publish/subscribe server
//!
//! Main entry point for the SocketHub CLI and server.

mod cli;
mod cmd_config;
mod cmd_push;
mod server;

use clap::Parser;
use tracing::warn;

use sockethub_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands, LogFormat};
use crate::server::{init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;

    let format = cli
        .log_format
        .or_else(|| LogFormat::parse(&config.logging.format))
        .unwrap_or(LogFormat::Pretty);
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };

    let command = cli.command.unwrap_or(Commands::Run {
        host: None,
        port: None,
        profile: false,
    });

    match command {
        Commands::Run {
            host,
            port,
            profile,
        } => {
            init_tracing(&level, format, config.logging.directory.as_deref())?;

            let validation = ConfigValidator::validate(&config);
            for warning in &validation.warnings {
                warn!("{}: {}", warning.path, warning.message);
            }
            if let Some(err) = validation.into_error() {
                return Err(err.into());
            }

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            run_server(config, host, port, profile).await
        }
        Commands::Push {
            topic,
            data,
            host,
            port,
        } => {
            init_tracing(&level, format, None)?;
            cmd_push::push(&config, topic, &data, host, port).await
        }
        Commands::CheckConfig => cmd_config::check_config(&config, cli.config.as_deref()),
    }
}
