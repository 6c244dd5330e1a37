//! Cache configuration types and defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::cache;

/// Configuration for the CSV cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the three CSV tables
    pub cache_root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(cache::DEFAULT_CACHE_DIR),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_root, PathBuf::from("data/cache"));
    }

    #[test]
    fn test_custom_root() {
        let config = CacheConfig::with_cache_root("/tmp/jobs");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/jobs"));
    }
}
