//! Multi-scale Haar cascade detector

use crate::cascade::HaarCascade;
use crate::grouping::group_rectangles;
use crate::integral::IntegralImage;
use crate::{DetectionError, DetectorParams, RegionDetector};
use character_recognition_common::Rectangle;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for cascade detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Relative edge tolerance when grouping neighboring hits (0.0-1.0)
    #[serde(default = "default_group_eps")]
    pub group_eps: f64,
    /// Largest window (width, height) to scan; `None` = whole image
    #[serde(default)]
    pub max_size: Option<(u32, u32)>,
}

fn default_group_eps() -> f64 {
    0.2
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            group_eps: default_group_eps(),
            max_size: None,
        }
    }
}

/// Haar cascade detector, immutable after construction
pub struct CascadeDetector {
    cascade: HaarCascade,
    config: CascadeConfig,
}

impl CascadeDetector {
    #[must_use]
    pub fn new(cascade: HaarCascade, config: CascadeConfig) -> Self {
        Self { cascade, config }
    }

    /// Load the cascade XML at `path`
    pub fn from_file<P: AsRef<Path>>(path: P, config: CascadeConfig) -> Result<Self, DetectionError> {
        Ok(Self::new(HaarCascade::from_file(path)?, config))
    }

    #[must_use]
    pub fn cascade(&self) -> &HaarCascade {
        &self.cascade
    }

    /// Pyramid scales whose window fits between `min_size` and the image/max size
    fn scales(&self, image_width: u32, image_height: u32, params: &DetectorParams) -> Vec<f64> {
        let (win_w, win_h) = self.cascade.window_size();
        let (max_w, max_h) = self
            .config
            .max_size
            .map_or((image_width, image_height), |(w, h)| {
                (w.min(image_width), h.min(image_height))
            });

        let mut scales = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let window_w = (f64::from(win_w) * factor).round() as u32;
            let window_h = (f64::from(win_h) * factor).round() as u32;
            if window_w > max_w || window_h > max_h {
                break;
            }
            if window_w >= params.min_size.0 && window_h >= params.min_size.1 {
                scales.push(factor);
            }
            factor *= params.scale_factor;
        }
        scales
    }

    /// Raw cascade hits over every scale, before neighbor grouping
    pub fn detect_raw(
        &self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rectangle>, DetectionError> {
        params.validate()?;

        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError::InvalidImageDimensions(format!(
                "{width}x{height}"
            )));
        }

        let (win_w, win_h) = self.cascade.window_size();
        let mut hits = Vec::new();

        for factor in self.scales(width, height, params) {
            let scaled_w = (f64::from(width) / factor).round() as u32;
            let scaled_h = (f64::from(height) / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                continue;
            }

            let integral = if scaled_w == width && scaled_h == height {
                IntegralImage::new(gray)
            } else {
                let scaled = image::imageops::resize(
                    gray,
                    scaled_w,
                    scaled_h,
                    image::imageops::FilterType::Triangle,
                );
                IntegralImage::new(&scaled)
            };

            let step = if factor > 2.0 { 1 } else { 2 };
            let window_w = (f64::from(win_w) * factor).round() as u32;
            let window_h = (f64::from(win_h) * factor).round() as u32;
            let before = hits.len();

            for y in (0..=scaled_h - win_h).step_by(step) {
                for x in (0..=scaled_w - win_w).step_by(step) {
                    if self.cascade.classify_window(&integral, x, y) {
                        let rect = Rectangle::new(
                            (f64::from(x) * factor).round() as u32,
                            (f64::from(y) * factor).round() as u32,
                            window_w,
                            window_h,
                        );
                        // Rounding can push the last column/row one pixel out
                        if let Some(clipped) = rect.clip_to(width, height) {
                            hits.push(clipped);
                        }
                    }
                }
            }

            debug!(
                "Scale {:.3} ({}x{} window): {} hits",
                factor,
                window_w,
                window_h,
                hits.len() - before
            );
        }

        Ok(hits)
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(
        &self,
        image: &RgbImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rectangle>, DetectionError> {
        let gray = image::imageops::grayscale(image);
        let raw = self.detect_raw(&gray, params)?;
        let grouped = group_rectangles(&raw, params.min_neighbors, self.config.group_eps);

        debug!(
            "Cascade pass (scale {}, neighbors {}, min {:?}): {} raw, {} grouped",
            params.scale_factor,
            params.min_neighbors,
            params.min_size,
            raw.len(),
            grouped.len()
        );

        Ok(grouped)
    }
}
