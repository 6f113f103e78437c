use crate::cache::{self, DiskCache, SingleFlight};
use crate::config::{SourceFormat, ThumbKitConfig};
use crate::paths::{CacheEntry, PathResolver};
use crate::transform::{
    resolve_dimensions, CropGeometry, EncodeSettings, ImageCodec, ImageCrateCodec, ImageOptions,
    OriginalImage, RenderJob,
};
use crate::{Metrics, Result, ThumbKitError};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Outcome of [`ThumbKit::image`]: the reference to hand to a client and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The name already was a path or URL and is returned untouched.
    PassThrough(String),
    /// The original is served without resizing.
    Original(String),
    /// A fresh variant was already on disk.
    Cached(String),
    /// The variant was rendered and written by this call.
    Generated(String),
}

impl Resolved {
    pub fn url(&self) -> &str {
        match self {
            Resolved::PassThrough(u)
            | Resolved::Original(u)
            | Resolved::Cached(u)
            | Resolved::Generated(u) => u,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            Resolved::PassThrough(u)
            | Resolved::Original(u)
            | Resolved::Cached(u)
            | Resolved::Generated(u) => u,
        }
    }
}

/// Serves crop-resized variants of the originals under a configured root,
/// rendering each `(name, width, height)` variant once and reusing it until
/// the original changes.
pub struct ThumbKit {
    config: ThumbKitConfig,
    paths: PathResolver,
    cache: DiskCache,
    codec: Arc<dyn ImageCodec>,
    flights: SingleFlight<PathBuf>,
    metrics: Metrics,
}

impl ThumbKit {
    /// Validates `config` and builds an instance using the `image` crate codec.
    pub fn new(config: ThumbKitConfig) -> Result<Self> {
        Self::with_codec(config, Arc::new(ImageCrateCodec))
    }

    pub fn with_codec(config: ThumbKitConfig, codec: Arc<dyn ImageCodec>) -> Result<Self> {
        config.validate()?;
        let paths = PathResolver::new(&config);
        Ok(Self {
            cache: DiskCache::new(paths.clone()),
            paths,
            codec,
            flights: SingleFlight::new(),
            metrics: Metrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &ThumbKitConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Resolves `name` to the reference of its `options`-sized variant,
    /// rendering the variant first when no fresh copy is cached.
    ///
    /// Names containing a path separator come back unchanged without touching
    /// the disk. Requests without dimensions, originals whose format is
    /// unknown or not allowed, and outputs with a side above
    /// `max_dimension` resolve to the original's reference.
    ///
    /// # Errors
    /// - [`ThumbKitError::NotFound`] when the original is not a regular file
    /// - [`ThumbKitError::Transform`] / [`ThumbKitError::CacheWrite`] when
    ///   rendering or persisting fails; see [`ThumbKit::image_or_original`]
    pub async fn image(&self, name: &str, options: &ImageOptions) -> Result<Resolved> {
        let Some(original) = self.paths.resolve(name) else {
            tracing::debug!("Passing through resolved reference {}", name);
            return Ok(Resolved::PassThrough(name.to_string()));
        };

        if !cache::is_regular_file(&original.path).await {
            tracing::debug!("Original not found: {}", original.path.display());
            return Err(ThumbKitError::NotFound(name.to_string()));
        }

        if options.is_empty() {
            return Ok(Resolved::Original(original.url));
        }

        let Some(info) = self.probe(&original.path).await? else {
            tracing::debug!("Unrecognized image {}, serving original", name);
            return Ok(Resolved::Original(original.url));
        };
        let Some(format) = self.allowed_format(&info) else {
            tracing::debug!("Format {:?} of {} not allowed, serving original", info.format, name);
            return Ok(Resolved::Original(original.url));
        };
        let Some((width, height)) = resolve_dimensions(&info, options) else {
            return Ok(Resolved::Original(original.url));
        };
        if !self.config.within_limits(width, height) {
            tracing::warn!(
                "Refusing {}x{} variant of {} (max side {}), serving original",
                width,
                height,
                name,
                self.config.max_dimension
            );
            return Ok(Resolved::Original(original.url));
        }

        let entry = self.cache.entry_for(&original, width, height);
        if self.cache.get(&entry, &original.path).await.is_some() {
            tracing::info!("Cache hit for {}", entry.path.display());
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Resolved::Cached(entry.url));
        }

        // Concurrent misses for the same variant queue here; whoever comes
        // second finds the first one's output and serves it.
        let _flight = self.flights.acquire(entry.path.clone()).await;
        if self.cache.get(&entry, &original.path).await.is_some() {
            tracing::info!("Cache hit for {} after waiting on render", entry.path.display());
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Resolved::Cached(entry.url));
        }

        tracing::info!(
            "Cache miss for {}, rendering {}x{} from {}",
            entry.path.display(),
            width,
            height,
            original.path.display()
        );
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        let job = RenderJob {
            source: original.path.clone(),
            format,
            geometry: CropGeometry::cover((info.width, info.height), (width, height)),
            settings: EncodeSettings::from(&self.config),
        };
        if let Err(e) = self.render(job, entry.clone()).await {
            self.metrics.errors.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        Ok(Resolved::Generated(entry.url))
    }

    /// Like [`ThumbKit::image`], but a failed render or cache write degrades
    /// to the original's reference instead of an error.
    pub async fn image_or_original(&self, name: &str, options: &ImageOptions) -> Result<Resolved> {
        match self.image(name, options).await {
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Serving original for {} after failure: {}", name, e);
                match self.paths.resolve(name) {
                    Some(original) => Ok(Resolved::Original(original.url)),
                    None => Ok(Resolved::PassThrough(name.to_string())),
                }
            }
            other => other,
        }
    }

    fn allowed_format(&self, info: &OriginalImage) -> Option<SourceFormat> {
        info.format.filter(|f| self.config.allows(*f))
    }

    /// Header probe. Failures to read the header degrade to "unrecognized".
    async fn probe(&self, path: &Path) -> Result<Option<OriginalImage>> {
        let codec = self.codec.clone();
        let owned = path.to_path_buf();
        let probed = tokio::task::spawn_blocking(move || codec.probe(&owned))
            .await
            .map_err(|e| ThumbKitError::InternalError(e.to_string()))?;

        match probed {
            Ok(info) => Ok(info),
            Err(e) => {
                tracing::warn!("Failed to probe {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn render(&self, job: RenderJob, entry: CacheEntry) -> Result<()> {
        self.metrics.transforms.fetch_add(1, Ordering::Relaxed);
        let codec = self.codec.clone();
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || {
            let bytes = codec.render(&job)?;
            cache.put(&entry, &bytes)
        })
        .await
        .map_err(|e| ThumbKitError::InternalError(e.to_string()))?
    }
}
