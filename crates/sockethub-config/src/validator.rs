//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_origins(config, &mut result);
        Self::validate_websocket(config, &mut result);
        Self::validate_push(config, &mut result);
        Self::validate_periodic(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_origins(config: &Config, result: &mut ValidationResult) {
        if config.origins.check && config.origins.allowed.is_empty() {
            result.add_warning(ValidationWarning::new(
                "origins.allowed",
                "Origin check is enabled with no configured origins; only localhost and 127.0.0.1 will pass",
            ));
        }

        for (i, origin) in config.origins.allowed.iter().enumerate() {
            if origin.contains("://") {
                result.add_warning(ValidationWarning::new(
                    format!("origins.allowed[{}]", i),
                    format!("'{}' contains a scheme; origins are compared by host only", origin),
                ));
            }
        }
    }

    fn validate_websocket(config: &Config, result: &mut ValidationResult) {
        if config.websocket.max_message_size == 0 {
            result.add_error(ValidationError::new(
                "websocket.max_message_size",
                "max_message_size must be greater than 0",
            ));
        }

        if !config.websocket.path.starts_with('/') {
            result.add_error(ValidationError::new(
                "websocket.path",
                "path must start with '/'",
            ));
        }
    }

    fn validate_push(config: &Config, result: &mut ValidationResult) {
        if !config.push.enabled {
            return;
        }

        if config.push.port == 0 {
            result.add_error(ValidationError::new("push.port", "Port cannot be 0"));
        }

        if config.push.host.is_empty() {
            result.add_error(ValidationError::new("push.host", "Host cannot be empty"));
        }

        if config.push.host == config.server.host && config.push.port == config.server.port {
            result.add_error(ValidationError::new(
                "push.port",
                "Push transport cannot share the WebSocket server endpoint",
            ));
        }
    }

    fn validate_periodic(config: &Config, result: &mut ValidationResult) {
        if config.periodic.memory_usage_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "periodic.memory_usage_interval_secs",
                "memory_usage_interval_secs must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if !matches!(config.logging.format.as_str(), "pretty" | "json") {
            result.add_error(ValidationError::new(
                "logging.format",
                format!("Unknown log format '{}', expected 'pretty' or 'json'", config.logging.format),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
