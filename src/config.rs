//! Client configuration
//!
//! Defaults, an optional JSON file, then environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};

/// Quiet period before a same-parent reorder is persisted
pub const DEFAULT_DEBOUNCE_MS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Base URL of the board service
    pub api_base_url: String,
    pub debounce_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl BoardConfig {
    /// Read a JSON config file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> BoardResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BoardError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| BoardError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `KANBAN_API_URL`, `KANBAN_DEBOUNCE_MS`, `KANBAN_REQUEST_TIMEOUT_MS`
    pub fn with_env_overrides(self) -> BoardResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> BoardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KANBAN_API_URL") {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup("KANBAN_DEBOUNCE_MS") {
            self.debounce_ms = parse_millis("KANBAN_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("KANBAN_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_millis("KANBAN_REQUEST_TIMEOUT_MS", &raw)?;
        }
        Ok(self)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> BoardResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| BoardError::Config(format!("{} must be a number of milliseconds, got {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(3000));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"{"debounce_ms": 250}"#).unwrap();

        let config = BoardConfig::load(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn test_load_missing_file() {
        let err = BoardConfig::load("/nonexistent/board.json").unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = BoardConfig::default()
            .with_overrides(|key| match key {
                "KANBAN_API_URL" => Some("http://boards.internal".to_string()),
                "KANBAN_DEBOUNCE_MS" => Some(" 500 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.api_base_url, "http://boards.internal");
        assert_eq!(config.debounce_ms, 500);

        let err = BoardConfig::default()
            .with_overrides(|key| (key == "KANBAN_DEBOUNCE_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }
}
