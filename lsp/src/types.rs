//! Configuration types consumed by the server.
//!
//! Both sections deserialize from the `[server]` and `[engine]` tables of
//! the config file; every field has a default so partial tables are fine.

use serde::Deserialize;

use crate::codec::DEFAULT_MAX_FRAME_BYTES;

/// Transport and reporting settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Prefix for per-code documentation links. No links when unset.
    pub error_url_base: Option<String>,
    /// Extensions picked up by the workspace walk after `initialized`.
    pub file_extensions: Vec<String>,
    /// Upper bound on one inbound frame body.
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            error_url_base: None,
            file_extensions: vec!["rb".to_string(), "rbi".to_string()],
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ServerConfig {
    /// Whether `path` carries one of the configured extensions.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| self.file_extensions.iter().any(|e| e == ext))
    }
}

/// Settings for the built-in delimiter engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Line-leading keywords whose lines make up a file's declaration
    /// shape. An edit that leaves these lines alone keeps the fast path.
    pub declaration_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            declaration_keywords: ["def", "class", "module"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.error_url_base, None);
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert!(config.accepts("lib/a.rb"));
        assert!(config.accepts("sig/a.rbi"));
        assert!(!config.accepts("README.md"));
        assert!(!config.accepts("Rakefile"));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_value(serde_json::json!({"error_url_base": "https://e/"})).unwrap();
        assert_eq!(config.error_url_base.as_deref(), Some("https://e/"));
        assert_eq!(config.file_extensions, vec!["rb", "rbi"]);
    }

    #[test]
    fn test_engine_defaults() {
        let config: EngineConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.declaration_keywords, vec!["def", "class", "module"]);
    }
}
