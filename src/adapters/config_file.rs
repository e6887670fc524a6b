//! JSON file configuration adapter.
//!
//! A missing file yields defaults; a present file may override any subset of
//! fields. Values are validated on load and before every save.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonFileConfig {
    fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            info!("config: {} not found, using defaults", self.path.display());
            return Ok(EngineConfig::default());
        }
        let text = fs::read_to_string(&self.path)?;
        let config: EngineConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))?;
        config.validate()?;
        info!("config: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &EngineConfig) -> Result<()> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pipeguard-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let port = JsonFileConfig::new(temp_path("missing"));
        let c = port.load().unwrap();
        assert_eq!(c.window_capacity, EngineConfig::default().window_capacity);
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let port = JsonFileConfig::new(&path);
        let mut c = EngineConfig::default();
        c.min_area = 750.0;
        port.save(&c).unwrap();
        assert_eq!(port.load().unwrap().min_area, 750.0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn invalid_values_are_not_persisted() {
        let path = temp_path("invalid");
        let port = JsonFileConfig::new(&path);
        let mut c = EngineConfig::default();
        c.score_cap = -1.0;
        assert!(matches!(port.save(&c), Err(Error::Config(_))));
        assert!(!path.exists());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let path = temp_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileConfig::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let _ = fs::remove_file(path);
    }
}
