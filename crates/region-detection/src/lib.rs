//! Region detection for character recognition
//!
//! This crate defines the detector contract consumed by the recognition
//! pipeline and ships a pure-Rust Haar cascade detector that reads OpenCV
//! cascade XML files (e.g. `haarcascade_frontalface_default.xml`).
//!
//! # Features
//! - [`RegionDetector`] trait: image + parameter set in, raw rectangles out
//! - Multi-scale sliding-window evaluation over an image pyramid
//! - Variance-normalized Haar features on integral images
//! - Neighbor grouping (`min_neighbors`) of overlapping raw hits
//!
//! # Example
//! ```no_run
//! use character_recognition_region_detection::{
//!     CascadeConfig, CascadeDetector, DetectorParams, RegionDetector,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = CascadeDetector::from_file(
//!     "models/haarcascade_frontalface_default.xml",
//!     CascadeConfig::default(),
//! )?;
//!
//! let img = image::open("image.jpg")?.to_rgb8();
//! let regions = detector.detect(&img, &DetectorParams::default())?;
//!
//! for region in regions {
//!     println!("{}x{} at ({}, {})", region.width, region.height, region.x, region.y);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod detector;
pub mod grouping;
pub mod integral;

pub use cascade::HaarCascade;
pub use detector::{CascadeConfig, CascadeDetector};

use character_recognition_common::{ProcessingError, Rectangle};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One detector pass configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Pyramid step between consecutive scales (must be > 1.0)
    pub scale_factor: f64,
    /// Minimum number of grouped neighbors a hit needs to be kept (0 = no grouping)
    pub min_neighbors: u32,
    /// Minimum object size (width, height) in pixels
    pub min_size: (u32, u32),
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: (30, 30),
        }
    }
}

impl DetectorParams {
    #[must_use]
    pub fn new(scale_factor: f64, min_neighbors: u32, min_size: (u32, u32)) -> Self {
        Self {
            scale_factor,
            min_neighbors,
            min_size,
        }
    }

    /// Reject parameter sets the detector cannot run with
    pub fn validate(&self) -> Result<(), DetectionError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(DetectionError::InvalidParameters(format!(
                "scale_factor must be > 1.0, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }
}

/// Detector contract: returns raw candidate rectangles in pixel space
///
/// Implementations attach no confidence; overlapping and duplicated hits are
/// expected and resolved downstream.
pub trait RegionDetector: Send + Sync {
    fn detect(
        &self,
        image: &RgbImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rectangle>, DetectionError>;
}

impl<T: RegionDetector + ?Sized> RegionDetector for Box<T> {
    fn detect(
        &self,
        image: &RgbImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rectangle>, DetectionError> {
        (**self).detect(image, params)
    }
}

/// Errors that can occur during region detection
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to load cascade: {0}")]
    CascadeLoad(#[from] std::io::Error),

    #[error("Malformed cascade: {0}")]
    CascadeFormat(String),

    #[error("Unsupported cascade: {0}")]
    UnsupportedCascade(String),

    #[error("Invalid detector parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid image dimensions: {0}")]
    InvalidImageDimensions(String),
}

impl From<DetectionError> for ProcessingError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::CascadeLoad(e) => ProcessingError::IoError(e),
            DetectionError::InvalidImageDimensions(msg) => ProcessingError::InvalidInput(msg),
            other => ProcessingError::Model(other.to_string()),
        }
    }
}
