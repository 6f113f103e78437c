use crate::config::{SourceFormat, ThumbKitConfig};
use crate::ThumbKitError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub mod geometry;
pub mod params;

pub use geometry::{CropGeometry, PixelRect};
pub use params::{resolve_dimensions, ImageOptions};

/// What the header of an original says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalImage {
    pub width: u32,
    pub height: u32,
    /// `None` when the container is not one of the [`SourceFormat`]s.
    pub format: Option<SourceFormat>,
}

/// Encoder knobs taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub jpeg_quality: u8,
    pub png_compression: u8,
}

impl From<&ThumbKitConfig> for EncodeSettings {
    fn from(cfg: &ThumbKitConfig) -> Self {
        Self {
            jpeg_quality: cfg.jpeg_quality,
            png_compression: cfg.png_compression,
        }
    }
}

/// One cache-miss worth of pixel work.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: PathBuf,
    pub format: SourceFormat,
    pub geometry: CropGeometry,
    pub settings: EncodeSettings,
}

/// Decode/crop/resize/encode collaborator.
///
/// Both calls block on disk and CPU; callers run them off the async
/// executor.
pub trait ImageCodec: Send + Sync {
    /// Read dimensions and container format from the file header.
    /// `Ok(None)` means the file is not a recognizable image.
    fn probe(&self, path: &Path) -> Result<Option<OriginalImage>, ThumbKitError>;

    /// Produce the encoded bytes of the variant described by `job`.
    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, ThumbKitError>;
}

/// [`ImageCodec`] backed by the `image` crate (plus `webp` for lossy WebP).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn probe(&self, path: &Path) -> Result<Option<OriginalImage>, ThumbKitError> {
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| ThumbKitError::Transform(e.to_string()))?;

        let Some(guessed) = reader.format() else {
            return Ok(None);
        };
        let format = SourceFormat::from_image_format(guessed);

        match reader.into_dimensions() {
            Ok((width, height)) if width > 0 && height > 0 => {
                Ok(Some(OriginalImage { width, height, format }))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::debug!("Unreadable image header at {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, ThumbKitError> {
        let img = decode_image(&job.source)?;
        let resized = crop_resize(&img, &job.geometry, job.format.supports_alpha());
        encode_image(&resized, job.format, &job.settings)
    }
}

/// Decodes an original from disk, detecting the container from its magic bytes.
pub fn decode_image(path: &Path) -> Result<DynamicImage, ThumbKitError> {
    ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ThumbKitError::Transform(e.to_string()))?
        .decode()
        .map_err(|e| ThumbKitError::Transform(e.to_string()))
}

/// Cuts the geometry's crop out of `img` and scales it to the output canvas.
///
/// The canvas is RGBA when `keep_alpha` is set so transparent regions survive,
/// RGB otherwise. Lanczos3 keeps downscaled edges clean.
pub fn crop_resize(img: &DynamicImage, geometry: &CropGeometry, keep_alpha: bool) -> DynamicImage {
    let rect = geometry.pixel_rect(img.dimensions());
    let canvas = if keep_alpha {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    canvas
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .resize_exact(
            geometry.output_width.max(1),
            geometry.output_height.max(1),
            FilterType::Lanczos3,
        )
}

/// Encodes `img` in the original's format using the configured knobs.
///
/// - **JPEG**: quality clamped to 1-100, RGB only
/// - **PNG**: compression level 0-9 folded onto fast/default/best
/// - **GIF**: palette quantized by the `image` encoder
/// - **WebP**: lossy via libwebp at the JPEG quality
pub fn encode_image(
    img: &DynamicImage,
    format: SourceFormat,
    settings: &EncodeSettings,
) -> Result<Vec<u8>, ThumbKitError> {
    let mut out = Vec::new();

    match format {
        SourceFormat::Jpeg => {
            let q = settings.jpeg_quality.clamp(1, 100);
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let enc = JpegEncoder::new_with_quality(&mut out, q);
            enc.write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(|e| ThumbKitError::Transform(e.to_string()))?;
        }
        SourceFormat::Png => {
            let enc = PngEncoder::new_with_quality(
                &mut out,
                png_compression(settings.png_compression),
                PngFilter::Adaptive,
            );
            let written = if img.color().has_alpha() {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                enc.write_image(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
            } else {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                enc.write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
            };
            written.map_err(|e| ThumbKitError::Transform(e.to_string()))?;
        }
        SourceFormat::Gif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Gif)
                .map_err(|e| ThumbKitError::Transform(e.to_string()))?;
        }
        SourceFormat::WebP => {
            let q = settings.jpeg_quality.clamp(1, 100) as f32;
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            let encoded = webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode(q);
            out.extend_from_slice(&encoded);
        }
    }

    Ok(out)
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}
