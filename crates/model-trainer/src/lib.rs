//! Training support for the image classifier service
//!
//! This crate compiles a [`inference_engine::Sequential`] network with a loss
//! and an Adam optimizer, fits it on in-memory batches and provides the two
//! stock model recipes used by the build programs.

pub mod data;
pub mod loss;
pub mod optimizer;
pub mod recipes;
pub mod trainer;

// Re-export commonly used types
pub use data::SyntheticDataset;
pub use loss::Loss;
pub use optimizer::{Adam, AdamConfig, AdamState};
pub use trainer::{CompileSettings, CompiledModel, EpochMetrics, FitOptions, History, Metric};
