//! CLI definitions for SocketHub.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SocketHub CLI.
#[derive(Parser)]
#[command(name = "sockethub")]
#[command(about = "WebSocket publish/subscribe server")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SOCKETHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Console log format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the server in foreground (default)
    Run {
        /// Server host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Log process memory usage periodically
        #[arg(long)]
        profile: bool,
    },

    /// Publish a payload to a topic through the push transport
    Push {
        /// Topic URI
        #[arg(long)]
        topic: String,

        /// JSON data (plain strings are sent as JSON strings)
        #[arg(long)]
        data: String,

        /// Push transport host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Push transport port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration file and exit
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["sockethub"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "sockethub", "run", "--host", "0.0.0.0", "--port", "9000", "--profile",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                host,
                port,
                profile,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
                assert!(profile);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_push() {
        let cli = Cli::try_parse_from([
            "sockethub", "push", "--topic", "news", "--data", "{\"a\":1}", "--log-format", "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Some(Commands::Push { ref topic, .. }) if topic == "news"));
    }

    #[test]
    fn test_push_requires_topic() {
        assert!(Cli::try_parse_from(["sockethub", "push", "--data", "1"]).is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
