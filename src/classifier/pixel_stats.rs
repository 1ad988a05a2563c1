//! Pixel-statistics fallback classifier.
//!
//! Derives a coarse `"{condition} {food}"` label from mean channel values and
//! the share of dark and bright pixels. Needs no model files and never fails
//! on a decoded image.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use image::imageops::FilterType;

use crate::Result;
use crate::classifier::ImageClassifier;
use crate::preprocess::PreprocessedImage;
use crate::random::RandomSource;
use crate::types::Prediction;

/// Side of the square grid statistics are computed over.
const GRID_SIZE: u32 = 100;

/// Pixels with mean brightness below this count as dark.
const DARK_THRESHOLD: f64 = 100.0;

/// Pixels with mean brightness above this count as bright.
const BRIGHT_THRESHOLD: f64 = 180.0;

/// Summary statistics over the sampling grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelStatistics {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    /// Fraction of pixels with brightness `< 100`.
    pub dark_fraction: f64,
    /// Fraction of pixels with brightness `> 180`.
    pub bright_fraction: f64,
}

impl PixelStatistics {
    /// Compute statistics over `pixels` resampled to a 100x100 grid.
    pub fn compute(pixels: &RgbImage) -> Self {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Self::default();
        }
        let grid = image::imageops::resize(pixels, GRID_SIZE, GRID_SIZE, FilterType::Triangle);

        let (mut r_sum, mut g_sum, mut b_sum) = (0.0, 0.0, 0.0);
        let (mut dark, mut bright) = (0usize, 0usize);
        for pixel in grid.pixels() {
            let [r, g, b] = pixel.0.map(f64::from);
            r_sum += r;
            g_sum += g;
            b_sum += b;
            let brightness = (r + g + b) / 3.0;
            if brightness < DARK_THRESHOLD {
                dark += 1;
            } else if brightness > BRIGHT_THRESHOLD {
                bright += 1;
            }
        }

        let count = (GRID_SIZE * GRID_SIZE) as f64;
        Self {
            mean_r: r_sum / count,
            mean_g: g_sum / count,
            mean_b: b_sum / count,
            dark_fraction: dark as f64 / count,
            bright_fraction: bright as f64 / count,
        }
    }

    fn red_dominant(&self) -> bool {
        self.mean_r > 1.2 * self.mean_g && self.mean_r > 1.2 * self.mean_b
    }

    fn green_dominant(&self) -> bool {
        self.mean_g > 1.1 * self.mean_r && self.mean_g > 1.1 * self.mean_b
    }

    fn banana_toned(&self) -> bool {
        self.mean_r > 150.0 && self.mean_g > 120.0
    }

    /// Condition word implied by the dark/bright fractions.
    pub fn condition(&self) -> &'static str {
        if self.dark_fraction > 0.3 {
            "rotten"
        } else if self.dark_fraction > 0.15 || self.bright_fraction < 0.1 {
            "expiring"
        } else {
            "fresh"
        }
    }
}

/// Fallback classifier over raw pixel statistics.
pub struct PixelStatsClassifier {
    random: Arc<dyn RandomSource>,
}

impl PixelStatsClassifier {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Classify decoded pixels. Always yields exactly one prediction.
    pub fn classify_pixels(&self, pixels: &RgbImage) -> Prediction {
        let stats = PixelStatistics::compute(pixels);

        let food = if stats.red_dominant() {
            *self.random.pick(&["apple", "tomato"])
        } else if stats.green_dominant() {
            *self.random.pick(&["lettuce", "cucumber"])
        } else if stats.banana_toned() {
            "banana"
        } else {
            "produce"
        };

        let label = format!("{} {}", stats.condition(), food);
        let score = self.random.range(0.75, 0.95);
        Prediction::new(label, score)
    }
}

impl std::fmt::Debug for PixelStatsClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelStatsClassifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageClassifier for PixelStatsClassifier {
    fn name(&self) -> &str {
        "pixel-stats"
    }

    async fn classify(&self, image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        Ok(vec![self.classify_pixels(image.pixels())])
    }
}
