//! `sockethub check-config`: validate configuration.

use std::path::Path;

use sockethub_config::{Config, ConfigValidator};

/// Print validation findings. Fails when any error is found.
pub(crate) fn check_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<defaults>".to_string());
    let result = ConfigValidator::validate(config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("{}: OK", source);
        return Ok(());
    }

    let count = result.errors.len();
    match result.into_error() {
        Some(first) => Err(anyhow::Error::new(first).context(format!("{}: {} error(s)", source, count))),
        None => Ok(()),
    }
}
