use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{Rgb, RgbImage};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use thumbkit::config::ThumbKitConfig;
use thumbkit::{router, ThumbKit};
use tower::util::ServiceExt; // for `oneshot`

/// Helper to create an app over a temp media root holding one 800x600 JPEG
fn test_app() -> (TempDir, Router) {
    let root = tempfile::tempdir().unwrap();
    let originals = root.path().join("originals");
    std::fs::create_dir_all(&originals).unwrap();
    RgbImage::from_pixel(800, 600, Rgb([40, 80, 120]))
        .save(originals.join("photo.jpg"))
        .unwrap();

    let cfg = ThumbKitConfig {
        physical_root: root.path().to_path_buf(),
        virtual_root: "/media".to_string(),
        ..Default::default()
    };
    let kit = Arc::new(ThumbKit::new(cfg).unwrap());
    (root, router(kit))
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_root, app) = test_app();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "thumbkit");
}

#[tokio::test]
async fn test_img_redirects_to_resized_variant() {
    let (root, app) = test_app();

    let response = get(&app, "/img/photo.jpg?w=400").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/media/resized/400x300_photo.jpg");
    assert!(root.path().join("resized/400x300_photo.jpg").is_file());

    // Long parameter names work too
    let response = get(&app, "/img/photo.jpg?width=400&height=300").await;
    assert_eq!(location(&response), "/media/resized/400x300_photo.jpg");
}

#[tokio::test]
async fn test_redirect_target_is_served() {
    let (_root, app) = test_app();

    let response = get(&app, "/img/photo.jpg?w=100&h=100").await;
    let target = location(&response).to_string();

    let served = get(&app, &target).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.headers()[header::CONTENT_TYPE], "image/jpeg");

    let body = axum::body::to_bytes(served.into_body(), usize::MAX).await.unwrap();
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));
}

#[tokio::test]
async fn test_img_without_dimensions_redirects_to_original() {
    let (_root, app) = test_app();
    let response = get(&app, "/img/photo.jpg").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/media/originals/photo.jpg");
}

#[tokio::test]
async fn test_missing_image_is_404() {
    let (_root, app) = test_app();
    let response = get(&app, "/img/ghost.jpg?w=100").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_dimensions_are_rejected() {
    let (_root, app) = test_app();
    let response = get(&app, "/img/photo.jpg?w=wide").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_count_hits_and_misses() {
    let (_root, app) = test_app();
    get(&app, "/img/photo.jpg?w=200").await;
    get(&app, "/img/photo.jpg?w=200").await;

    let response = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("thumbkit_cache_misses_total 1"));
    assert!(text.contains("thumbkit_cache_hits_total 1"));
    assert!(text.contains("thumbkit_transforms_total 1"));
}

#[tokio::test]
async fn test_encoded_url_name_is_not_redirected() {
    let (_root, app) = test_app();
    let response = get(&app, "/img/https:%2F%2Fevil.example%2Fx.png?w=10").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());

    let response = get(&app, "/img/%2Fetc%2Fpasswd").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_request_redirects_to_original() {
    let (root, app) = test_app();
    let response = get(&app, "/img/photo.jpg?w=4294967295&h=1").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/media/originals/photo.jpg");
    assert!(!root.path().join("resized").exists());
}
