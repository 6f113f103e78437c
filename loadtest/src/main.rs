use goose::prelude::*;
use rand::Rng;

/// Load testing suite for the ThumbKit resize cache.
///
/// Simulates the traffic a template layer produces:
/// - Repeated requests for a handful of variants (cache hits after warmup)
/// - Requests for many distinct variants (cache misses, one render each)
/// - Health monitoring
///
/// The server must have `LOADTEST_IMAGE` (default `photo.jpg`) under its
/// `originals/` directory.
///
/// # Usage
/// ```bash
/// cd loadtest
/// cargo run --release -- --host http://localhost:8080 --users 10 --hatch-rate 2 --run-time 60s
/// ```
#[tokio::main]
async fn main() -> Result<(), GooseError> {
    GooseAttack::initialize()?
        .register_scenario(
            scenario!("CachePerformance")
                // Fixed variants: steady-state hit latency
                .register_transaction(transaction!(cached_image).set_weight(15)?)
                // Wide dimension spread: render throughput
                .register_transaction(transaction!(uncached_image).set_weight(5)?)
                .register_transaction(transaction!(health_check).set_weight(1)?),
        )
        .execute()
        .await?;

    Ok(())
}

fn image_name() -> String {
    std::env::var("LOADTEST_IMAGE").unwrap_or_else(|_| "photo.jpg".to_string())
}

/// Requests one of a few fixed thumbnails so every call after warmup is a cache hit.
async fn cached_image(user: &mut GooseUser) -> TransactionResult {
    let path = {
        let mut rng = rand::thread_rng();
        let sizes = [(160, 160), (320, 240), (640, 480)];
        let (w, h) = sizes[rng.gen_range(0..sizes.len())];
        format!("/img/{}?w={}&h={}", image_name(), w, h)
    };

    let _goose = user.get(&path).await?;
    Ok(())
}

/// Requests randomly sized variants, which mostly miss and render.
async fn uncached_image(user: &mut GooseUser) -> TransactionResult {
    // Generate random parameters before await to satisfy Send bounds
    let path = {
        let mut rng = rand::thread_rng();
        let width = rng.gen_range(50..1000);
        if rng.gen_bool(0.5) {
            format!("/img/{}?w={}", image_name(), width)
        } else {
            format!("/img/{}?w={}&h={}", image_name(), width, rng.gen_range(50..1000))
        }
    };

    let _goose = user.get(&path).await?;
    Ok(())
}

/// Baseline latency separate from image work.
async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose = user.get("/health").await?;
    Ok(())
}
