//! HTTP API for the image classifier service
//!
//! Exposes `GET /health` and a multipart `POST /predict` route on top of a
//! shared [`inference_engine::ImageClassifier`].

pub mod error;
pub mod handlers;
pub mod rest;
pub mod routes;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use error::ApiError;
pub use rest::RestApi;
pub use routes::api_routes;
pub use state::AppState;
