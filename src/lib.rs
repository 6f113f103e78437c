use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::ServeDir;

pub mod cache;
pub mod config;
pub mod paths;
pub mod thumbnailer;
pub mod transform;

pub use crate::config::{ConfigError, SourceFormat, ThumbKitConfig};
pub use crate::thumbnailer::{Resolved, ThumbKit};
pub use crate::transform::ImageOptions;

#[derive(Error, Debug)]
pub enum ThumbKitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Cache write failed for {path:?}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Transformation error: {0}")]
    Transform(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ThumbKitError {
    /// Failures after which serving the original is still a valid answer.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ThumbKitError::CacheWrite { .. } | ThumbKitError::Transform(_) | ThumbKitError::InternalError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ThumbKitError>;

/// Request counters, one set per [`ThumbKit`] instance.
#[derive(Debug, Default)]
pub struct Metrics {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub transforms: AtomicU64,
    pub errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prometheus text exposition of the counters.
    pub fn render(&self) -> String {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let transforms = self.transforms.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);

        format!(
            "# HELP thumbkit_cache_hits_total Total number of cache hits\n\
             # TYPE thumbkit_cache_hits_total counter\n\
             thumbkit_cache_hits_total {}\n\
             # HELP thumbkit_cache_misses_total Total number of cache misses\n\
             # TYPE thumbkit_cache_misses_total counter\n\
             thumbkit_cache_misses_total {}\n\
             # HELP thumbkit_transforms_total Total number of image transformations\n\
             # TYPE thumbkit_transforms_total counter\n\
             thumbkit_transforms_total {}\n\
             # HELP thumbkit_errors_total Total number of failed transformations\n\
             # TYPE thumbkit_errors_total counter\n\
             thumbkit_errors_total {}\n",
            hits, misses, transforms, errors
        )
    }
}

async fn handler(
    State(kit): State<Arc<ThumbKit>>,
    Path(name): Path<String>,
    Query(options): Query<ImageOptions>,
) -> Response {
    tracing::debug!(
        "Processing image request: name={}, w={:?}, h={:?}",
        name,
        options.width,
        options.height
    );

    match kit.image_or_original(&name, &options).await {
        // Only names under the originals root are redirected to
        Ok(Resolved::PassThrough(_)) => {
            tracing::warn!("Rejecting non-logical image name {:?}", name);
            (StatusCode::BAD_REQUEST, "Invalid image name").into_response()
        }
        Ok(resolved) => Redirect::temporary(resolved.url()).into_response(),
        Err(ThumbKitError::NotFound(n)) => {
            (StatusCode::NOT_FOUND, format!("Not found: {}", n)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to resolve {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    use serde_json::json;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "thumbkit"
    }))
}

/// Metrics endpoint (Prometheus-compatible plain text)
async fn metrics_handler(State(kit): State<Arc<ThumbKit>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        kit.metrics().render(),
    )
}

/// Builds the HTTP surface: `/img/:name?w=&h=` redirects to the resolved
/// reference, plus `/health` and `/metrics`.
///
/// When the virtual root is a local path (e.g. `/media`), the physical root is
/// also served under it so the redirects resolve against this server.
pub fn router(kit: Arc<ThumbKit>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler).with_state(kit.clone()))
        .route("/img/:name", get(handler).with_state(kit.clone()));

    let files = ServeDir::new(&kit.config().physical_root);
    let mount = kit.config().virtual_root.trim_end_matches('/');
    if kit.config().virtual_root.starts_with('/') {
        if mount.is_empty() {
            app = app.fallback_service(files);
        } else {
            app = app.nest_service(mount, files);
        }
        tracing::info!("Serving {} under {:?}", kit.config().physical_root.display(), kit.config().virtual_root);
    }

    app
}
