//! Common utilities and types for the image classifier service
//! 
//! This crate provides shared functionality used across the workspace,
//! including error types, the prediction data model, and utility functions.

pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
