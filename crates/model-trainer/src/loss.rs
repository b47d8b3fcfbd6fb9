//! Loss functions

use serde::{Deserialize, Serialize};

use common::error::{Error, Result};
use inference_engine::Tensor;

/// Clamp applied to probabilities before taking the log
pub const PROBABILITY_EPSILON: f32 = 1e-7;

/// Supported training losses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Cross-entropy against an integer class index, on softmax outputs
    #[default]
    SparseCategoricalCrossentropy,
}

impl Loss {
    /// Loss value for one sample
    pub fn value(&self, probabilities: &Tensor, target: usize) -> Result<f32> {
        match self {
            Loss::SparseCategoricalCrossentropy => {
                let p = probability_of(probabilities, target)?;
                Ok(-p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON).ln())
            }
        }
    }
    
    /// Gradient w.r.t. the softmax pre-activation for one sample
    pub fn grad_logits(&self, probabilities: &Tensor, target: usize) -> Result<Tensor> {
        match self {
            Loss::SparseCategoricalCrossentropy => {
                probability_of(probabilities, target)?;
                let mut grad = probabilities.clone();
                grad[[target]] -= 1.0;
                Ok(grad)
            }
        }
    }
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loss::SparseCategoricalCrossentropy => write!(f, "sparse_categorical_crossentropy"),
        }
    }
}

fn probability_of(probabilities: &Tensor, target: usize) -> Result<f32> {
    if probabilities.ndim() != 1 {
        return Err(Error::Shape(format!(
            "loss expects a 1-D probability vector, got shape {:?}",
            probabilities.shape()
        )));
    }
    
    probabilities.get([target]).copied().ok_or_else(|| {
        Error::Training(format!(
            "label {} out of range for {} classes",
            target,
            probabilities.len()
        ))
    })
}
