use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the store location. `db_override` wins over the data directory.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        if let Some(db_path) = db_override {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
            return Ok(Config { db_path });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "grocer").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("grocer.db"),
        })
    }
}

/// Where and how to reach the remote catalog service.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_override_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("grocer.db");
        let config = Config::load(Some(path.clone())).unwrap();
        assert_eq!(config.db_path, path);
        assert!(dir.path().join("nested").is_dir());
    }
}
