//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use dactyl_core::LockoutConfig;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding the per-user template registries
    pub store_dir: PathBuf,

    /// Timeout for enrollment operations (seconds)
    pub enroll_timeout_secs: u64,

    /// Failed-attempt thresholds and lockout backoff
    pub lockout: LockoutConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_dir: Self::default_store_dir(),
            enroll_timeout_secs: 60,
            lockout: LockoutConfig::default(),
        }
    }
}

impl ServiceConfig {
    fn default_store_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("dactyl")
            .join("templates")
    }

    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create directories if they don't exist
    pub fn ensure_directories(&self) -> crate::Result<()> {
        std::fs::create_dir_all(&self.store_dir)?;
        Ok(())
    }
}

/// Helper module for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.enroll_timeout_secs, 60);
        assert_eq!(config.lockout.timed_threshold, 5);
        assert!(config.store_dir.ends_with("dactyl/templates"));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = ServiceConfig::default();
        config.enroll_timeout_secs = 120;
        config.lockout.timed_threshold = 3;
        config.save(&path).unwrap();
        let loaded = ServiceConfig::load(&path).unwrap();
        assert_eq!(loaded.enroll_timeout_secs, 120);
        assert_eq!(loaded.lockout.timed_threshold, 3);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServiceConfig::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn ensure_directories_creates_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            store_dir: dir.path().join("nested").join("templates"),
            ..ServiceConfig::default()
        };
        config.ensure_directories().unwrap();
        assert!(config.store_dir.is_dir());
    }
}
