//! Configuration management for the image classifier service
//!
//! Settings are resolved in layers: built-in defaults, then an optional TOML
//! file, then `CLASSIFIER_`-prefixed environment variables.

pub mod defaults;
pub mod manager;
pub mod settings;
pub mod validation;

// Re-export commonly used types
pub use manager::ConfigManager;
pub use settings::{LogFormat, LoggingSettings, ModelSettings, ServerSettings, ServiceConfig};
pub use validation::ConfigValidator;
