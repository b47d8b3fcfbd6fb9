//! Shared request state

use std::sync::Arc;

use common::error::{Error, Result};
use common::models::ClassLabels;
use inference_engine::{ImageClassifier, ImagePreprocessor};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Read-only model
    pub classifier: Arc<dyn ImageClassifier>,
    
    /// Labels, index-aligned with the classifier output
    pub labels: Arc<ClassLabels>,
    
    /// Decoder sized for the classifier input
    pub preprocessor: ImagePreprocessor,
}

impl AppState {
    /// Pairs a classifier with its labels
    pub fn new(classifier: Arc<dyn ImageClassifier>, labels: ClassLabels) -> Result<Self> {
        if classifier.num_classes() != labels.len() {
            return Err(Error::Config(format!(
                "classifier has {} outputs but {} labels were given",
                classifier.num_classes(),
                labels.len()
            )));
        }
        
        let preprocessor = ImagePreprocessor::new(classifier.input_shape());
        Ok(Self {
            classifier,
            labels: Arc::new(labels),
            preprocessor,
        })
    }
}
