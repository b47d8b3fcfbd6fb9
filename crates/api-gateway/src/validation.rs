//! Upload validation

use common::error::Error;

/// Detail returned when the upload is not declared as an image
pub const INVALID_CONTENT_TYPE_DETAIL: &str = "Only image files (e.g., JPEG, PNG) are allowed for prediction.";

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Whether a declared content type is `image/*`
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false)
}

/// Rejects uploads whose declared content type is not an image
pub fn ensure_image_content_type(content_type: Option<&str>) -> Result<(), Error> {
    if is_image_content_type(content_type) {
        Ok(())
    } else {
        Err(Error::InvalidContentType(INVALID_CONTENT_TYPE_DETAIL.to_string()))
    }
}
