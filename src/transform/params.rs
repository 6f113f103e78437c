use super::OriginalImage;
use serde::Deserialize;
use std::str::FromStr;

/// Requested target box. Either side may be omitted; zero counts as omitted.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Desired width of the output image
    #[serde(default, alias = "w")]
    pub width: Option<u32>,

    /// Desired height of the output image
    #[serde(default, alias = "h")]
    pub height: Option<u32>,
}

impl ImageOptions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn width(width: u32) -> Self {
        Self::new(Some(width), None)
    }

    pub fn height(height: u32) -> Self {
        Self::new(None, Some(height))
    }

    pub fn exact(width: u32, height: u32) -> Self {
        Self::new(Some(width), Some(height))
    }

    fn requested_width(&self) -> Option<u32> {
        self.width.filter(|w| *w > 0)
    }

    fn requested_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }

    /// True when neither side was asked for, i.e. the original should be served as-is.
    pub fn is_empty(&self) -> bool {
        self.requested_width().is_none() && self.requested_height().is_none()
    }
}

impl FromStr for ImageOptions {
    type Err = serde_urlencoded::de::Error;

    /// Parse a query string such as `w=400&h=300` or `width=400`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_urlencoded::from_str(s.trim_start_matches('?'))
    }
}

/// Fills in the missing side from the original's aspect ratio.
///
/// The inferred side is `floor(known * other_original / same_original)`,
/// clamped to at least one pixel. Returns `None` for an empty request.
pub fn resolve_dimensions(original: &OriginalImage, options: &ImageOptions) -> Option<(u32, u32)> {
    let (ow, oh) = (original.width as u64, original.height as u64);
    match (options.requested_width(), options.requested_height()) {
        (Some(w), Some(h)) => Some((w, h)),
        (Some(w), None) => Some((w, scale_floor(w, oh, ow))),
        (None, Some(h)) => Some((scale_floor(h, ow, oh), h)),
        (None, None) => None,
    }
}

fn scale_floor(known: u32, numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 1;
    }
    let scaled = known as u64 * numerator / denominator;
    scaled.clamp(1, u32::MAX as u64) as u32
}
