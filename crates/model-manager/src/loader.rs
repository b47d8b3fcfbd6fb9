//! Model loader implementation
//!
//! Loads the artifact once at startup and hands out the shared, read-only
//! classifier used by every request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use common::error::{Error, Result};
use common::models::ClassLabels;
use inference_engine::{CnnClassifier, ImageClassifier};

use crate::artifact::load_model;
use crate::metadata::ArtifactMetadata;

/// A model ready to serve
#[derive(Clone)]
pub struct LoadedModel {
    /// Shared classifier
    pub classifier: Arc<dyn ImageClassifier>,
    
    /// Artifact header
    pub metadata: ArtifactMetadata,
    
    /// Labels, one per output
    pub labels: ClassLabels,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("metadata", &self.metadata)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

/// Loads the model artifact named in the configuration
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Artifact path
    path: PathBuf,
    
    /// Labels the model must produce
    labels: ClassLabels,
}

impl ModelLoader {
    /// Creates a loader for `path`
    pub fn new(path: impl Into<PathBuf>, labels: ClassLabels) -> Self {
        Self {
            path: path.into(),
            labels,
        }
    }
    
    /// Artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }
    
    /// Reads the artifact and checks it against the label set
    pub fn load(&self) -> Result<LoadedModel> {
        info!("Loading model from {}", self.path.display());
        
        let artifact = load_model(&self.path).map_err(|e| {
            warn!("Model could not be loaded from {}: {}", self.path.display(), e);
            e
        })?;
        
        if artifact.optimizer_state.is_some() {
            info!("Ignoring saved optimizer state for inference");
        }
        
        let classifier = CnnClassifier::new(artifact.network)?;
        if classifier.num_classes() != self.labels.len() {
            return Err(Error::Config(format!(
                "model {} outputs {} classes but {} labels are configured",
                artifact.metadata.name,
                classifier.num_classes(),
                self.labels.len()
            )));
        }
        
        info!(
            "Model {} ready: input {}, {} classes, {} params",
            artifact.metadata.name,
            classifier.input_shape(),
            classifier.num_classes(),
            artifact.metadata.parameter_count
        );
        
        Ok(LoadedModel {
            classifier: Arc::new(classifier),
            metadata: artifact.metadata,
            labels: self.labels.clone(),
        })
    }
}
