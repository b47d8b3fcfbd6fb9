//! Common data models for the image classifier service
//!
//! This module defines the request/response payloads shared between the
//! HTTP layer and the inference path, plus the label set used to name classes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::argmax;

/// Status string reported by the health route
pub const HEALTH_STATUS_OK: &str = "ok";

/// Message reported by the health route once the model is loaded
pub const HEALTH_MESSAGE: &str = "API is healthy and model is loaded.";

/// Health check payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Process status
    pub status: String,
    /// Human readable description
    pub message: String,
}

impl HealthResponse {
    /// The fixed payload returned while the process is serving
    pub fn healthy() -> Self {
        Self {
            status: HEALTH_STATUS_OK.to_string(),
            message: HEALTH_MESSAGE.to_string(),
        }
    }
}

/// Prediction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Arg-max class label
    pub class_label: String,
    /// Per-class probabilities, in label order
    pub probabilities: Vec<f32>,
}

/// One entry of a request validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Error kind, e.g. `missing`
    #[serde(rename = "type")]
    pub kind: String,
    /// Location of the offending value, e.g. `["body", "file"]`
    pub loc: Vec<String>,
    /// Human readable message
    pub msg: String,
    /// Offending input, `null` when absent
    pub input: Option<serde_json::Value>,
}

impl ValidationErrorDetail {
    /// Detail entry for a required body field that was not supplied
    pub fn missing_body_field(field: &str) -> Self {
        Self {
            kind: "missing".to_string(),
            loc: vec!["body".to_string(), field.to_string()],
            msg: "Field required".to_string(),
            input: None,
        }
    }
}

/// Ordered set of class labels, index-aligned with the model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels(Vec<String>);

impl ClassLabels {
    /// Creates a label set, rejecting empty or duplicated labels
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::Config("label set must not be empty".to_string()));
        }

        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(Error::Config(format!("duplicate label: {}", label)));
            }
        }

        Ok(Self(labels))
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed label set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label at the given class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// All labels in class order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Builds the response for a probability vector by picking its arg-max label
    pub fn to_prediction(&self, probabilities: Vec<f32>) -> Result<PredictionResponse> {
        if probabilities.len() != self.len() {
            return Err(Error::Inference(format!(
                "model produced {} probabilities for {} labels",
                probabilities.len(),
                self.len()
            )));
        }

        let index = argmax(&probabilities)
            .ok_or_else(|| Error::Inference("empty probability vector".to_string()))?;

        let class_label = self
            .get(index)
            .ok_or_else(|| Error::Internal(format!("no label for class {}", index)))?
            .to_string();

        Ok(PredictionResponse {
            class_label,
            probabilities,
        })
    }
}
