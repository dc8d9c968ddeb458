//! Configuration for the RunLoop.

use serde::{Deserialize, Serialize};

/// RunLoop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLoopConfig {
    /// Capacity of the wakeup channel.
    #[serde(default = "default_wakeup_capacity")]
    pub wakeup_capacity: usize,

    /// Capacity of each Source1 channel created by integrations.
    #[serde(default = "default_source1_capacity")]
    pub source1_capacity: usize,

    /// Whether to enable metrics collection.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_wakeup_capacity() -> usize {
    1024
}

fn default_source1_capacity() -> usize {
    256
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            wakeup_capacity: default_wakeup_capacity(),
            source1_capacity: default_source1_capacity(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunLoopConfig::default();
        assert_eq!(config.wakeup_capacity, 1024);
        assert_eq!(config.source1_capacity, 256);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_config_partial_deserialization() {
        let parsed: RunLoopConfig = serde_json::from_str(r#"{"source1_capacity": 8}"#).unwrap();
        assert_eq!(parsed.source1_capacity, 8);
        assert_eq!(parsed.wakeup_capacity, 1024);
    }
}
