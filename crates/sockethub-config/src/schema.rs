//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub origins: OriginsConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub push: PushConfig,

    #[serde(default)]
    pub periodic: PeriodicConfig,

    #[serde(default)]
    pub topic_timers: TopicTimersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Display name used in the launch log line and the WAMP welcome.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            name: default_server_name(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_server_name() -> String {
    "SocketHub".to_string()
}

/// Origin check configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginsConfig {
    /// Reject handshakes whose Origin host is not allowed.
    #[serde(default)]
    pub check: bool,

    /// Allowed origin hosts, in addition to localhost and 127.0.0.1.
    #[serde(default)]
    pub allowed: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_path")]
    pub path: String,

    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_ws_path() -> String {
    "/".to_string()
}

fn default_max_message_size() -> usize {
    64 * 1024
}

/// Session binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_cookie_name() -> String {
    "SOCKETHUB_SESSID".to_string()
}

/// Push transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_push_port")]
    pub port: u16,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_push_port(),
        }
    }
}

fn default_push_port() -> u16 {
    5555
}

/// Process-wide periodic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicConfig {
    /// Memory usage sampling interval when profiling.
    #[serde(default = "default_memory_usage_interval")]
    pub memory_usage_interval_secs: u64,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            memory_usage_interval_secs: default_memory_usage_interval(),
        }
    }
}

fn default_memory_usage_interval() -> u64 {
    5
}

/// Topic timer registry policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicTimersConfig {
    #[serde(default = "default_true")]
    pub cancel_on_clear: bool,

    #[serde(default = "default_true")]
    pub retain_empty_topics: bool,
}

impl Default for TopicTimersConfig {
    fn default() -> Self {
        Self {
            cancel_on_clear: true,
            retain_empty_topics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.name, "SocketHub");
        assert!(!config.origins.check);
        assert!(config.origins.allowed.is_empty());
        assert_eq!(config.websocket.path, "/");
        assert_eq!(config.websocket.max_message_size, 65536);
        assert!(!config.push.enabled);
        assert_eq!(config.push.port, 5555);
        assert_eq!(config.periodic.memory_usage_interval_secs, 5);
        assert!(config.topic_timers.cancel_on_clear);
        assert!(config.topic_timers.retain_empty_topics);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_serialize_roundtrip_through_toml() {
        let mut config = Config::default();
        config.origins.allowed = vec!["example.com".to_string()];
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.origins.allowed, vec!["example.com".to_string()]);
    }
}
