//! HTTP error responses
//!
//! Every failure is rendered as `{"detail": ...}`. A missing form field uses
//! the validation-error array shape; everything else carries a message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use common::error::Error;
use common::models::ValidationErrorDetail;

/// Wrapper turning [`Error`] into an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidContentType(_) | Error::ImageDecode(_) | Error::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        
        if let Error::MissingField(field) = &self.0 {
            let detail = vec![ValidationErrorDetail::missing_body_field(field)];
            return (status, Json(json!({ "detail": detail }))).into_response();
        }
        
        let detail = if status.is_server_error() {
            error!("Request failed: {}", self.0);
            format!("Internal server error: {}", self.0)
        } else {
            warn!("Rejected request ({}): {}", status.as_u16(), self.0);
            self.0.to_string()
        };
        
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
