//! CURIE prefixes registered by a client.

use std::collections::HashMap;

/// Per-connection `prefix -> URI` table used to expand `prefix:suffix`.
#[derive(Debug, Clone, Default)]
pub struct PrefixMap {
    prefixes: HashMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    /// Expand a CURIE. Anything without a known prefix is returned as is.
    pub fn resolve(&self, uri: &str) -> String {
        if let Some((prefix, suffix)) = uri.split_once(':') {
            if let Some(base) = self.prefixes.get(prefix) {
                return format!("{}{}", base, suffix);
            }
        }
        uri.to_string()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
