//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default byte budget for cached images (8 MiB).
pub const DEFAULT_MAX_CACHE_BYTES: usize = 8 * 1024 * 1024;

/// Cache and sample server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum cumulative size of cached image payloads, in bytes
    pub max_cache_bytes: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Entity metadata JSON file; the bundled sample metadata is used when unset
    pub metadata_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_BYTES` - Image byte budget (default: 8 MiB)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `ENTITY_METADATA` - Path to the entity metadata document (default: unset)
    pub fn from_env() -> Self {
        Self {
            max_cache_bytes: env::var("MAX_CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CACHE_BYTES),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            metadata_path: env::var("ENTITY_METADATA")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
            server_port: 3000,
            metadata_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_cache_bytes, 8 * 1024 * 1024);
        assert_eq!(config.server_port, 3000);
        assert!(config.metadata_path.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_CACHE_BYTES");
        env::remove_var("SERVER_PORT");
        env::remove_var("ENTITY_METADATA");

        let config = Config::from_env();
        assert_eq!(config.max_cache_bytes, DEFAULT_MAX_CACHE_BYTES);
        assert_eq!(config.server_port, 3000);
        assert!(config.metadata_path.is_none());
    }
}
