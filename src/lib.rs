//! Main integration module for the image classifier
//!
//! This module wires configuration, the model loader and the HTTP API into
//! a single service and provides the entry point used by the binary.

use std::future::Future;

use anyhow::{Context, Result};
use tracing::{info, warn};

use api_gateway::{AppState, RestApi};
use model_manager::{LoadedModel, ModelLoader};
use service_config::ServiceConfig;

/// Image classifier service
pub struct ClassifierService {
    /// Resolved configuration
    config: ServiceConfig,
    
    /// Model loaded at startup
    model: LoadedModel,
}

impl ClassifierService {
    /// Loads the model named in `config`; any failure here is fatal
    pub fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing image classifier");
        
        let labels = config.model.class_labels().context("invalid label configuration")?;
        let model = ModelLoader::new(&config.model.path, labels)
            .load()
            .with_context(|| format!("failed to load model from {}", config.model.path.display()))?;
        
        Ok(Self { config, model })
    }
    
    /// Resolved configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
    
    /// The loaded model
    pub fn model(&self) -> &LoadedModel {
        &self.model
    }
    
    /// Request state shared by the handlers
    pub fn app_state(&self) -> Result<AppState> {
        Ok(AppState::new(self.model.classifier.clone(), self.model.labels.clone())?)
    }
    
    /// Serves HTTP until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.server.socket_addr()?;
        let api = RestApi::new(addr, self.app_state()?, self.config.server.max_upload_bytes);
        
        info!("Image classifier starting on {}", api.addr());
        api.serve(shutdown).await
    }
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_manager::{save_model, ModelArtifact};
    use model_trainer::recipes::dummy_model;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;
    
    #[test]
    fn test_service_loads_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut rng = StdRng::seed_from_u64(1);
        let artifact = ModelArtifact::from_network(dummy_model(&mut rng).unwrap(), None).unwrap();
        save_model(&path, &artifact).unwrap();
        
        let mut config = ServiceConfig::default();
        config.model.path = path;
        
        let service = ClassifierService::new(config).unwrap();
        assert_eq!(service.model().labels.len(), 10);
        assert!(service.app_state().is_ok());
    }
    
    #[test]
    fn test_missing_model_is_fatal() {
        let dir = tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.model.path = dir.path().join("missing.json");
        
        let err = ClassifierService::new(config).err().unwrap();
        assert!(format!("{:#}", err).contains("Model file not found"));
    }
}
