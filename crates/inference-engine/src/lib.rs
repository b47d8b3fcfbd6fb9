//! Convolutional network execution for the image classifier service
//!
//! This crate provides a small sequential network built from stock layers
//! (convolution, max pooling, flatten, dense), the image preprocessing that
//! turns uploaded bytes into an input tensor, and the [`ImageClassifier`]
//! seam used by the HTTP layer.

pub mod activation;
pub mod classifier;
pub mod init;
pub mod layers;
pub mod network;
pub mod preprocess;
pub mod tensor;

// Re-export commonly used types
pub use activation::Activation;
pub use classifier::{CnnClassifier, ImageClassifier};
pub use layers::{Conv2D, Dense, Flatten, Layer, LayerCache, MaxPooling2D};
pub use network::{Sequential, SequentialBuilder};
pub use preprocess::ImagePreprocessor;
pub use tensor::{InputShape, Tensor};
