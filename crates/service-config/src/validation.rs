//! Configuration validation

use common::error::{Error, Result};

use crate::settings::ServiceConfig;

/// Checks a resolved configuration before the service starts
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates every section, returning the first problem found
    pub fn validate(config: &ServiceConfig) -> Result<()> {
        if config.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        
        if config.server.max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be positive".to_string()));
        }
        
        config.server.socket_addr()?;
        
        if config.model.path.as_os_str().is_empty() {
            return Err(Error::Config("model.path must not be empty".to_string()));
        }
        
        config.model.class_labels()?;
        
        Ok(())
    }
}
