//! Allowed origins.

use indexmap::IndexSet;
use url::Url;

/// Hosts that always pass the origin check.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Configured origin hosts, in registration order.
#[derive(Debug, Clone, Default)]
pub struct OriginRegistry {
    origins: IndexSet<String>,
}

impl OriginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_origin(&mut self, origin: impl Into<String>) {
        self.origins.insert(origin.into());
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// The defaults followed by every configured origin, without duplicates.
    pub fn effective_origins(&self) -> IndexSet<String> {
        DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|s| s.to_string())
            .chain(self.origins.iter().cloned())
            .collect()
    }
}

/// Host part of an `Origin` header value.
///
/// Values that do not parse as URLs are compared verbatim.
pub fn origin_host(origin: &str) -> String {
    match Url::parse(origin) {
        Ok(url) => url
            .host_str()
            .map(|h| h.trim_matches(|c| c == '[' || c == ']').to_string())
            .unwrap_or_else(|| origin.to_string()),
        Err(_) => origin.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_origins_include_defaults_once() {
        let mut registry = OriginRegistry::new();
        registry.add_origin("example.com");
        registry.add_origin("localhost");
        registry.add_origin("example.com");
        assert_eq!(registry.len(), 2);

        let effective: Vec<String> = registry.effective_origins().into_iter().collect();
        assert_eq!(effective, vec!["localhost", "127.0.0.1", "example.com"]);
    }

    #[test]
    fn test_origin_host() {
        assert_eq!(origin_host("http://localhost:3000"), "localhost");
        assert_eq!(origin_host("https://app.example.com"), "app.example.com");
        assert_eq!(origin_host("example.com"), "example.com");
        assert_eq!(origin_host("null"), "null");
    }
}
