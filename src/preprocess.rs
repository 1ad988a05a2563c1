//! Image decoding and normalisation.
//!
//! Every input goes through the same steps before any classifier sees it:
//! decode, bound the longest side, flatten transparency onto white, apply a
//! linear brightness/contrast lift, and re-encode as JPEG.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::{AnalysisError, Result};

/// Encoded image bytes as captured by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    bytes: Vec<u8>,
}

impl RawImage {
    /// Wrap an encoded buffer (JPEG, PNG, WebP, ...).
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AnalysisError::ImageDecode("not a data URI".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| AnalysisError::ImageDecode("data URI has no payload".to_string()))?;
        if !meta.ends_with(";base64") {
            return Err(AnalysisError::ImageDecode(
                "only base64 data URIs are supported".to_string(),
            ));
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| AnalysisError::ImageDecode(format!("invalid base64 payload: {e}")))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for RawImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

/// Normalised pixels plus their JPEG re-encoding.
///
/// The in-process classifiers (ONNX and pixel statistics) read
/// [`pixels`](Self::pixels). The JPEG form is the hand-off format for
/// external model runtimes that accept only encoded images, and it matches
/// what such a runtime would have received from the camera or upload layer.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pixels: RgbImage,
    encoded: Vec<u8>,
}

impl PreprocessedImage {
    /// Wrap already-normalised pixels, encoding them at `quality`.
    pub fn from_pixels(pixels: RgbImage, quality: u8) -> Result<Self> {
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, quality).write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(Self { pixels, encoded })
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// The same pixels as a JPEG at the configured quality, for model
    /// runtimes that take encoded input. Not read by the built-in classifiers.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Applies [`PreprocessConfig`] to raw images.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Decode and normalise one image.
    ///
    /// Fails with [`AnalysisError::ImageDecode`] on unreadable input.
    pub fn preprocess(&self, image: &RawImage) -> Result<PreprocessedImage> {
        if image.is_empty() {
            return Err(AnalysisError::ImageDecode("empty image buffer".to_string()));
        }
        let decoded = image::load_from_memory(image.as_bytes())
            .map_err(|e| AnalysisError::ImageDecode(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        let (target_w, target_h) = scaled_dimensions(width, height, self.config.max_size);
        let rgba = decoded.to_rgba8();
        let rgba = if (target_w, target_h) == (width, height) {
            rgba
        } else {
            image::imageops::resize(&rgba, target_w, target_h, FilterType::Triangle)
        };

        debug!(width, height, target_w, target_h, "preprocessing image");

        let pixels = self.adjust(&rgba);
        PreprocessedImage::from_pixels(pixels, self.config.jpeg_quality)
    }

    /// Flatten onto white, then `c' = min(255, c * gain + offset)` per channel.
    fn adjust(&self, rgba: &RgbaImage) -> RgbImage {
        let gain = self.config.gain;
        let offset = self.config.offset;
        RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as f32 / 255.0;
            let lift = |c: u8| {
                let flattened = c as f32 * alpha + 255.0 * (1.0 - alpha);
                (flattened * gain + offset).clamp(0.0, 255.0) as u8
            };
            image::Rgb([lift(r), lift(g), lift(b)])
        })
    }
}

/// Dimensions after scaling by `min(1, max_size / longest_side)`.
pub fn scaled_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_size {
        return (width, height);
    }
    let scale = max_size as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
