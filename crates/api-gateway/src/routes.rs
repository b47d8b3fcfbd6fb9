//! Router assembly

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the service router with upload limit and request tracing
pub fn api_routes(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use tower::ServiceExt;
    
    use common::error::Result;
    use common::models::ClassLabels;
    use inference_engine::{CnnClassifier, ImageClassifier, InputShape, Tensor};
    
    const BOUNDARY: &str = "classifier-test-boundary";
    const DEFAULT_LIMIT: usize = 10 * 1024 * 1024;
    
    /// Returns fixed probabilities and counts calls
    struct FixedClassifier {
        probabilities: Vec<f32>,
        calls: AtomicUsize,
    }
    
    impl FixedClassifier {
        fn new(probabilities: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                probabilities,
                calls: AtomicUsize::new(0),
            })
        }
    }
    
    impl ImageClassifier for FixedClassifier {
        fn input_shape(&self) -> InputShape {
            InputShape::new(8, 8, 3)
        }
        
        fn num_classes(&self) -> usize {
            self.probabilities.len()
        }
        
        fn classify(&self, _image: &Tensor) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probabilities.clone())
        }
    }
    
    fn cat_dog_app(classifier: Arc<FixedClassifier>) -> Router {
        let labels = ClassLabels::new(vec!["cat".to_string(), "dog".to_string()]).unwrap();
        api_routes(AppState::new(classifier, labels).unwrap(), DEFAULT_LIMIT)
    }
    
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 120, 200])))
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }
    
    fn multipart_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                field, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }
    
    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
    
    #[tokio::test]
    async fn test_health() {
        let app = cat_dog_app(FixedClassifier::new(vec![0.5, 0.5]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"status": "ok", "message": "API is healthy and model is loaded."})
        );
    }
    
    #[tokio::test]
    async fn test_predict_rejects_non_image() {
        let classifier = FixedClassifier::new(vec![0.5, 0.5]);
        let app = cat_dog_app(classifier.clone());
        
        let response = app
            .oneshot(multipart_request("file", "test.txt", "text/plain", b"This is not an image."))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().contains("Only image files"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }
    
    #[tokio::test]
    async fn test_predict_missing_file_field() {
        let app = cat_dog_app(FixedClassifier::new(vec![0.5, 0.5]));
        let response = app
            .oneshot(multipart_request("other", "a.png", "image/png", &png_bytes(4, 4)))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        let msg = body["detail"][0]["msg"].as_str().unwrap().to_lowercase();
        assert!(msg.contains("field required"));
        assert_eq!(body["detail"][0]["loc"], serde_json::json!(["body", "file"]));
    }
    
    #[tokio::test]
    async fn test_predict_without_multipart_body() {
        let app = cat_dog_app(FixedClassifier::new(vec![0.5, 0.5]));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/predict").body(Body::empty()).unwrap())
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["detail"][0]["type"], "missing");
        assert!(body["detail"][0]["input"].is_null());
    }
    
    #[tokio::test]
    async fn test_predict_with_mocked_inference() {
        let classifier = FixedClassifier::new(vec![0.05, 0.95]);
        let app = cat_dog_app(classifier.clone());
        
        let response = app
            .oneshot(multipart_request("file", "pet.png", "image/png", &png_bytes(20, 12)))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["class_label"], "dog");
        assert_eq!(body["probabilities"], serde_json::json!([0.05, 0.95]));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }
    
    #[tokio::test]
    async fn test_predict_undecodable_image() {
        let classifier = FixedClassifier::new(vec![0.5, 0.5]);
        let app = cat_dog_app(classifier.clone());
        
        let response = app
            .oneshot(multipart_request("file", "broken.png", "image/png", b"definitely not a png"))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid image"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }
    
    #[tokio::test]
    async fn test_predict_rejects_oversized_upload() {
        let classifier = FixedClassifier::new(vec![0.5, 0.5]);
        let labels = ClassLabels::new(vec!["cat".to_string(), "dog".to_string()]).unwrap();
        let app = api_routes(AppState::new(classifier.clone(), labels).unwrap(), 64);
        
        let response = app
            .oneshot(multipart_request("file", "large.png", "image/png", &png_bytes(64, 64)))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid multipart body"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }
    
    #[tokio::test]
    async fn test_predict_with_real_model() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = model_trainer::recipes::dummy_model(&mut rng).unwrap();
        let classifier: Arc<dyn ImageClassifier> = Arc::new(CnnClassifier::new(network).unwrap());
        let labels = ClassLabels::new(
            ["airplane", "automobile", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        let app = api_routes(AppState::new(classifier, labels.clone()).unwrap(), DEFAULT_LIMIT);
        
        let response = app
            .oneshot(multipart_request("file", "photo.png", "image/png", &png_bytes(100, 80)))
            .await
            .unwrap();
        
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let probabilities: Vec<f64> = body["probabilities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(probabilities.len(), 10);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-3);
        assert!(labels.as_slice().contains(&body["class_label"].as_str().unwrap().to_string()));
    }
    
    #[tokio::test]
    async fn test_label_mismatch_rejected() {
        let labels = ClassLabels::new(vec!["only".to_string()]).unwrap();
        assert!(AppState::new(FixedClassifier::new(vec![0.5, 0.5]), labels).is_err());
    }
}
