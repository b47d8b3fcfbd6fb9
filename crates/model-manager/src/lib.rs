//! Model lifecycle management for the image classifier service
//!
//! This crate persists trained networks as JSON artifacts and loads them
//! back at service startup, checking them against the configured labels.

pub mod artifact;
pub mod loader;
pub mod metadata;

// Re-export commonly used types
pub use artifact::{load_model, save_model, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use loader::{LoadedModel, ModelLoader};
pub use metadata::ArtifactMetadata;
