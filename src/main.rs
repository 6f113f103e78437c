use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thumbkit::{router, ThumbKit, ThumbKitConfig};

/// ThumbKit standalone server entry point.
///
/// Initializes tracing, loads and validates configuration, and serves resized
/// variants of the images under the physical root.
///
/// # Configuration
/// Environment variables:
/// - `THUMBKIT_PHYSICAL_ROOT`: directory holding `originals/` (default: `./media`)
/// - `THUMBKIT_VIRTUAL_ROOT`: public base path or URL (default: `/media`)
/// - `THUMBKIT_JPEG_QUALITY`, `THUMBKIT_PNG_COMPRESSION`: encoder settings
/// - `THUMBKIT_MAX_DIMENSION`: largest output side rendered (default: 4096)
/// - `THUMBKIT_RESIZED_SUBFOLDER`: keep variants under `resized/` (default: true)
/// - `THUMBKIT_ALLOWED_FORMATS`: comma list of gif, jpeg, png, webp
/// - `PORT`: HTTP listen port (default: 8080)
/// - `RUST_LOG`: logging verbosity (default: "thumbkit=debug,tower_http=debug")
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thumbkit=debug,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting ThumbKit server");

    let cfg = ThumbKitConfig::from_env()?;
    // Fails here, before any request, when a root is missing
    let kit = Arc::new(ThumbKit::new(cfg)?);

    let app = Router::new().merge(router(kit));

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
