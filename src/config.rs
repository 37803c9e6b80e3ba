//! Configuration loaded from `config.toml` with environment overrides

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_DB_NAME: &str = "coursegraph.db";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub mastery: MasteryConfig,
    pub planner: PlannerConfig,
    pub tree: TreeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Explicit database file; falls back to the per-user config directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryConfig {
    /// How many weak points to report when the caller gives no limit
    pub weak_point_limit: usize,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            weak_point_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Target mastery per knowledge point, as a fraction of 1.0
    pub mastery_threshold: f64,
    /// Optional cap on plan length in minutes
    pub time_budget_minutes: Option<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: 0.8,
            time_budget_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursegraph")
    }

    /// `COURSEGRAPH_CONFIG` wins over the per-user location
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("COURSEGRAPH_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Load configuration from the default location, or defaults if no file exists
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.planner.mastery_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::Config(format!(
                "planner.mastery_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.mastery.weak_point_limit == 0 {
            return Err(Error::Config(
                "mastery.weak_point_limit must be at least 1".to_string(),
            ));
        }
        if self.tree.max_depth == 0 {
            return Err(Error::Config(
                "tree.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the database file: `COURSEGRAPH_DB`, then the config file, then the config dir
    pub fn db_path(&self) -> PathBuf {
        if let Ok(path) = env::var("COURSEGRAPH_DB") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        let config_dir = Self::config_dir();
        fs::create_dir_all(&config_dir).ok();
        config_dir.join(DEFAULT_DB_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.planner.mastery_threshold, 0.8);
        assert_eq!(config.mastery.weak_point_limit, 5);
        assert_eq!(config.tree.max_depth, 64);
        assert!(config.planner.time_budget_minutes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.planner.mastery_threshold, 0.8);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[planner]\nmastery_threshold = 0.9\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.planner.mastery_threshold, 0.9);
        assert_eq!(config.mastery.weak_point_limit, 5);
        assert_eq!(config.tree.max_depth, 64);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[planner]\nmastery_threshold = 1.5\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[planner\nmastery_threshold = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.planner.time_budget_minutes = Some(240);
        config.database.path = Some(PathBuf::from("/tmp/graph.db"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.planner.time_budget_minutes, Some(240));
        assert_eq!(loaded.database.path, Some(PathBuf::from("/tmp/graph.db")));
    }

    #[test]
    fn zero_weak_point_limit_is_rejected() {
        let mut config = Config::default();
        config.mastery.weak_point_limit = 0;
        assert!(config.validate().is_err());
    }
}
