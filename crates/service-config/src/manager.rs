//! Configuration manager
//!
//! Resolves [`ServiceConfig`] from defaults, an optional TOML file and the
//! process environment.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::{debug, info};

use common::error::{Error, Result};

use crate::defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX};
use crate::settings::ServiceConfig;
use crate::validation::ConfigValidator;

/// Configuration manager for the image classifier service
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Resolved configuration
    config: ServiceConfig,
    
    /// File the configuration was read from, if any
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Loads configuration using the default file location when it exists
    pub fn new() -> Result<Self> {
        Self::load(Path::new(DEFAULT_CONFIG_FILE), false)
    }
    
    /// Loads configuration from an explicit file, which must exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(path.as_ref(), true)
    }
    
    /// Wraps an already-built configuration (used by tests and tools)
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        ConfigValidator::validate(&config)?;
        Ok(Self { config, source: None })
    }
    
    fn load(path: &Path, required: bool) -> Result<Self> {
        let file_present = path.exists();
        if required && !file_present {
            return Err(Error::Config(format!("config file not found: {}", path.display())));
        }
        
        let built = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("model.labels"),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        
        let config: ServiceConfig = built
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        
        ConfigValidator::validate(&config)?;
        
        let source = file_present.then(|| path.to_path_buf());
        match &source {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => debug!("No config file at {}, using defaults and environment", path.display()),
        }
        
        Ok(Self { config, source })
    }
    
    /// Gets the resolved configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
    
    /// Gets a mutable handle for command-line overrides
    pub fn config_mut(&mut self) -> &mut ServiceConfig {
        &mut self.config
    }
    
    /// Gets the file the configuration was read from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
    
    /// Re-validates after overrides have been applied
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate(&self.config)
    }
    
    /// Consumes the manager, returning the configuration
    pub fn into_config(self) -> ServiceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LogFormat;
    use std::io::Write;
    use std::sync::Mutex;
    
    /// Serialises tests that read or write `CLASSIFIER_*` variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());
    
    fn empty_config_file() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }
    
    #[test]
    fn test_file_overrides_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[model]
path = "artifacts/test_model.json"
labels = ["cat", "dog"]

[logging]
format = "json"
"#
        )
        .unwrap();
        
        let manager = ConfigManager::from_file(file.path()).unwrap();
        let config = manager.config();
        
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.path, PathBuf::from("artifacts/test_model.json"));
        assert_eq!(config.model.labels, vec!["cat".to_string(), "dog".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(manager.source(), Some(file.path()));
    }
    
    #[test]
    fn test_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigManager::from_file(dir.path().join("absent.toml"));
        assert!(result.is_err());
    }
    
    #[test]
    fn test_invalid_file_rejected() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[model]\nlabels = []").unwrap();
        
        assert!(ConfigManager::from_file(file.path()).is_err());
    }
    
    #[test]
    fn test_from_config() {
        let manager = ConfigManager::from_config(ServiceConfig::default()).unwrap();
        assert_eq!(manager.config().model.labels.len(), 10);
        assert!(manager.source().is_none());
    }
    
    #[test]
    fn test_env_overrides_port() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = empty_config_file();
        
        std::env::set_var("CLASSIFIER_SERVER__PORT", "9321");
        let result = ConfigManager::from_file(file.path());
        std::env::remove_var("CLASSIFIER_SERVER__PORT");
        
        let config = result.unwrap().into_config();
        assert_eq!(config.server.port, 9321);
        assert_eq!(config.server.host, "0.0.0.0");
    }
    
    #[test]
    fn test_env_overrides_labels() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = empty_config_file();
        
        std::env::set_var("CLASSIFIER_MODEL__LABELS", "cat,dog");
        let result = ConfigManager::from_file(file.path());
        std::env::remove_var("CLASSIFIER_MODEL__LABELS");
        
        let config = result.unwrap().into_config();
        assert_eq!(config.model.labels, vec!["cat".to_string(), "dog".to_string()]);
        assert_eq!(config.model.class_labels().unwrap().len(), 2);
    }
}
