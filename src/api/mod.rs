//! HTTP surface of the detection service.
//!
//! - `GET /` - welcome message
//! - `GET /health` - liveness and version
//! - `POST /detect/:kind` - multipart upload with a `file` field, answered
//!   with the report of the `arm`, `arm-fingers`, `eyes`, `head` or `people`
//!   detector

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/detect/:kind", post(handlers::detect))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DetectionQueue;
    use crate::queue::tests::{Stub, detectors, stopped_queue};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use image::{ImageFormat, RgbImage};
    use serde_json::{Value, json};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "biodetect-test-boundary";

    fn app() -> Router {
        let (queue, _worker) = DetectionQueue::spawn(detectors(&Stub::default())).unwrap();
        router(AppState::new(queue), &ServerConfig::default())
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"frame.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(kind: &str, field: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/detect/{kind}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, data)))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"message": "Welcome to the Biomedical Detection API"})
        );
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let response = app().oneshot(upload("legs", "file", &png(4, 4))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "Invalid endpoint. Must be one of ['arm', 'arm-fingers', 'eyes', 'head', 'people']"})
        );
    }

    #[tokio::test]
    async fn test_head_upload() {
        let response = app().oneshot(upload("head", "file", &png(40, 20))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "status": "success",
                "faces": [{"xmin": 10, "ymin": 5, "width": 20, "height": 10, "confidence": 40.0}]
            })
        );
    }

    #[tokio::test]
    async fn test_people_upload() {
        let response = app().oneshot(upload("people", "file", &png(640, 480))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["count"], 1);
        assert_eq!(body["landmarks"].as_array().unwrap().len(), 33);
        assert_eq!(body["landmarks"][0], json!({"x": 320.0, "y": 240.0, "z": 0.0}));
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let response = app().oneshot(upload("arm", "image", &png(4, 4))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await, json!({"detail": "Field required: file"}));
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let request = Request::builder()
            .method("POST")
            .uri("/detect/arm")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_undecodable_image() {
        let response = app()
            .oneshot(upload("head", "file", b"not an image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Error processing request: "), "{detail}");
    }

    #[tokio::test]
    async fn test_detection_error() {
        // the stub's face mesh has no iris landmarks
        let response = app().oneshot(upload("eyes", "file", &png(8, 8))).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Detection error: "), "{detail}");
    }

    #[tokio::test]
    async fn test_worker_unavailable() {
        let app = router(AppState::new(stopped_queue()), &ServerConfig::default());

        let response = app.oneshot(upload("arm", "file", &png(8, 8))).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_limit() {
        let config = ServerConfig {
            max_upload_bytes: 64,
            ..ServerConfig::default()
        };
        let (queue, _worker) = DetectionQueue::spawn(detectors(&Stub::default())).unwrap();
        let app = router(AppState::new(queue), &config);

        let response = app.oneshot(upload("head", "file", &[0u8; 1024])).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let preflight = |origin: &'static str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/detect/head")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let response = app().oneshot(preflight("http://localhost:5173")).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let response = app().oneshot(preflight("http://evil.example")).await.unwrap();
        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
