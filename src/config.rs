use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_PNG_COMPRESSION: u8 = 8;
pub const DEFAULT_VIRTUAL_ROOT: &str = "/media";
/// Largest output side rendered; bounds the canvas allocation per request.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Source formats the cache knows how to decode and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Gif,
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Gif => "gif",
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::WebP => "webp",
        }
    }

    /// Formats whose output canvas keeps an alpha channel.
    pub fn supports_alpha(self) -> bool {
        matches!(self, SourceFormat::Gif | SourceFormat::Png | SourceFormat::WebP)
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Gif => Some(SourceFormat::Gif),
            image::ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            image::ImageFormat::Png => Some(SourceFormat::Png),
            image::ImageFormat::WebP => Some(SourceFormat::WebP),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SourceFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gif" => Ok(SourceFormat::Gif),
            "jpeg" | "jpg" => Ok(SourceFormat::Jpeg),
            "png" => Ok(SourceFormat::Png),
            "webp" => Ok(SourceFormat::WebP),
            other => Err(ConfigError::InvalidValue {
                key: "format",
                value: other.to_string(),
            }),
        }
    }
}

/// Process-wide cache settings. Built once at startup and handed to
/// [`crate::ThumbKit::new`], which validates it before any request runs.
#[derive(Debug, Clone)]
pub struct ThumbKitConfig {
    /// Base directory holding the `originals/` and `resized/` trees.
    pub physical_root: PathBuf,
    /// Public base path or URL the physical root is reachable under.
    pub virtual_root: String,
    pub allowed_formats: Vec<SourceFormat>,
    pub jpeg_quality: u8,    // 0-100
    pub png_compression: u8, // 0-9
    /// Store variants under a sibling `resized/` tree instead of next to the originals.
    pub use_resized_subfolder: bool,
    /// Requests (explicit or inferred) with a wider or taller output get the original.
    pub max_dimension: u32,
}

impl Default for ThumbKitConfig {
    fn default() -> Self {
        Self {
            physical_root: PathBuf::from("./media"),
            virtual_root: DEFAULT_VIRTUAL_ROOT.to_string(),
            allowed_formats: vec![
                SourceFormat::Gif,
                SourceFormat::Jpeg,
                SourceFormat::Png,
                SourceFormat::WebP,
            ],
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            png_compression: DEFAULT_PNG_COMPRESSION,
            use_resized_subfolder: true,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Physical root cannot be empty")] MissingPhysicalRoot,
    #[error("Virtual root cannot be empty")] MissingVirtualRoot,
    #[error("JPEG quality must be within 0-100, got {0}")] InvalidJpegQuality(u8),
    #[error("PNG compression must be within 0-9, got {0}")] InvalidPngCompression(u8),
    #[error("At least one source format must be allowed")] NoAllowedFormats,
    #[error("Max dimension must be > 0")] InvalidMaxDimension,
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

impl ThumbKitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.physical_root.as_os_str().is_empty() { return Err(ConfigError::MissingPhysicalRoot); }
        if self.virtual_root.trim().is_empty() { return Err(ConfigError::MissingVirtualRoot); }
        if self.jpeg_quality > 100 { return Err(ConfigError::InvalidJpegQuality(self.jpeg_quality)); }
        if self.png_compression > 9 { return Err(ConfigError::InvalidPngCompression(self.png_compression)); }
        if self.allowed_formats.is_empty() { return Err(ConfigError::NoAllowedFormats); }
        if self.max_dimension == 0 { return Err(ConfigError::InvalidMaxDimension); }
        Ok(())
    }

    pub fn allows(&self, format: SourceFormat) -> bool {
        self.allowed_formats.contains(&format)
    }

    /// Whether a `width`x`height` output is small enough to render.
    pub fn within_limits(&self, width: u32, height: u32) -> bool {
        width <= self.max_dimension && height <= self.max_dimension
    }

    /// Loads settings from `THUMBKIT_*` environment variables, falling back to defaults.
    ///
    /// The result is not validated; call [`ThumbKitConfig::validate`] (or let
    /// [`crate::ThumbKit::new`] do it).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ThumbKitConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(root) = lookup("THUMBKIT_PHYSICAL_ROOT") {
            cfg.physical_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("THUMBKIT_VIRTUAL_ROOT") {
            cfg.virtual_root = root;
        }
        if let Some(q) = lookup("THUMBKIT_JPEG_QUALITY") {
            cfg.jpeg_quality = parse_value("THUMBKIT_JPEG_QUALITY", &q)?;
        }
        if let Some(c) = lookup("THUMBKIT_PNG_COMPRESSION") {
            cfg.png_compression = parse_value("THUMBKIT_PNG_COMPRESSION", &c)?;
        }
        if let Some(m) = lookup("THUMBKIT_MAX_DIMENSION") {
            cfg.max_dimension = m.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: "THUMBKIT_MAX_DIMENSION",
                value: m.clone(),
            })?;
        }
        if let Some(flag) = lookup("THUMBKIT_RESIZED_SUBFOLDER") {
            cfg.use_resized_subfolder = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "THUMBKIT_RESIZED_SUBFOLDER",
                        value: flag,
                    })
                }
            };
        }
        if let Some(list) = lookup("THUMBKIT_ALLOWED_FORMATS") {
            cfg.allowed_formats = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(SourceFormat::from_str)
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(cfg)
    }
}

fn parse_value(key: &'static str, raw: &str) -> Result<u8, ConfigError> {
    raw.trim().parse::<u8>().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ThumbKitConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.jpeg_quality, 90);
        assert_eq!(cfg.png_compression, 8);
        assert!(cfg.use_resized_subfolder);
    }

    #[test]
    fn empty_roots_are_rejected() {
        let cfg = ThumbKitConfig { physical_root: PathBuf::new(), ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::MissingPhysicalRoot));

        let cfg = ThumbKitConfig { virtual_root: "  ".into(), ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::MissingVirtualRoot));
    }

    #[test]
    fn out_of_range_encoder_settings_are_rejected() {
        let cfg = ThumbKitConfig { jpeg_quality: 101, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidJpegQuality(101)));

        let cfg = ThumbKitConfig { png_compression: 10, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidPngCompression(10)));

        let cfg = ThumbKitConfig { max_dimension: 0, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidMaxDimension));
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = ThumbKitConfig::from_lookup(lookup_from(&[
            ("THUMBKIT_PHYSICAL_ROOT", "/srv/img"),
            ("THUMBKIT_VIRTUAL_ROOT", "https://cdn.example.com/img"),
            ("THUMBKIT_JPEG_QUALITY", "75"),
            ("THUMBKIT_RESIZED_SUBFOLDER", "false"),
            ("THUMBKIT_MAX_DIMENSION", "2000"),
            ("THUMBKIT_ALLOWED_FORMATS", "jpg, png"),
        ]))
        .unwrap();

        assert_eq!(cfg.physical_root, PathBuf::from("/srv/img"));
        assert_eq!(cfg.virtual_root, "https://cdn.example.com/img");
        assert_eq!(cfg.jpeg_quality, 75);
        assert_eq!(cfg.png_compression, DEFAULT_PNG_COMPRESSION);
        assert!(!cfg.use_resized_subfolder);
        assert_eq!(cfg.max_dimension, 2000);
        assert_eq!(cfg.allowed_formats, vec![SourceFormat::Jpeg, SourceFormat::Png]);
    }

    #[test]
    fn unparsable_env_values_fail() {
        let err = ThumbKitConfig::from_lookup(lookup_from(&[("THUMBKIT_JPEG_QUALITY", "high")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "THUMBKIT_JPEG_QUALITY", .. }));

        let err = ThumbKitConfig::from_lookup(lookup_from(&[("THUMBKIT_ALLOWED_FORMATS", "bmp")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn output_limits_apply_to_each_side() {
        let cfg = ThumbKitConfig { max_dimension: 100, ..Default::default() };
        assert!(cfg.within_limits(100, 100));
        assert!(!cfg.within_limits(101, 1));
        assert!(!cfg.within_limits(1, u32::MAX));
    }

    #[test]
    fn alpha_formats() {
        assert!(SourceFormat::Png.supports_alpha());
        assert!(SourceFormat::Gif.supports_alpha());
        assert!(!SourceFormat::Jpeg.supports_alpha());
    }
}
