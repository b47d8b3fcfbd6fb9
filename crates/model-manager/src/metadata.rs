//! Model artifact metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::error::Result;
use inference_engine::{InputShape, Sequential};

/// Descriptive header stored alongside the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Model name
    pub name: String,
    
    /// When the artifact was written
    pub saved_at: DateTime<Utc>,
    
    /// Trainable scalars
    pub parameter_count: usize,
    
    /// Expected input
    pub input_shape: InputShape,
    
    /// Output width
    pub num_classes: usize,
    
    /// Whether optimizer slots were saved
    pub include_optimizer: bool,
}

impl ArtifactMetadata {
    /// Describes `network` as of now
    pub fn describe(network: &Sequential, include_optimizer: bool) -> Result<Self> {
        Ok(Self {
            name: network.name().to_string(),
            saved_at: Utc::now(),
            parameter_count: network.parameter_count(),
            input_shape: network.input_shape(),
            num_classes: network.num_classes()?,
            include_optimizer,
        })
    }
}
