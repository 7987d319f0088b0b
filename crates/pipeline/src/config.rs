//! Recognition configuration (YAML)

use crate::RecognitionError;
use character_recognition_region_detection::DetectorParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Tunables for one [`CharacterRecognizer`](crate::CharacterRecognizer)
///
/// Every field has a default, so a partial YAML file only needs the keys it
/// overrides:
///
/// ```yaml
/// iou_threshold: 0.3
/// expand_ratio: 0.5
/// detector_passes:
///   - { scale_factor: 1.1, min_neighbors: 3, min_size: [30, 30] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Candidates overlapping a kept region by more than this `IoU` are suppressed
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,

    /// Padding added on every side, as a fraction of the region size
    #[serde(default = "default_expand_ratio")]
    pub expand_ratio: f64,

    /// Detection confidence of the whole-image region used when nothing is found
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f32,

    /// Number of ranked labels kept per detection
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Classify the regions of one image on the rayon pool
    #[serde(default)]
    pub parallel_regions: bool,

    /// Detector parameter sets, run in order
    #[serde(default = "default_detector_passes")]
    pub detector_passes: Vec<DetectorParams>,
}

fn default_iou_threshold() -> f32 {
    0.3
}

fn default_expand_ratio() -> f64 {
    0.5
}

fn default_fallback_confidence() -> f32 {
    0.5
}

fn default_top_k() -> usize {
    5
}

fn default_detector_passes() -> Vec<DetectorParams> {
    vec![
        DetectorParams::new(1.1, 3, (30, 30)),
        DetectorParams::new(1.05, 3, (20, 20)),
        DetectorParams::new(1.2, 5, (40, 40)),
    ]
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: default_iou_threshold(),
            expand_ratio: default_expand_ratio(),
            fallback_confidence: default_fallback_confidence(),
            top_k: default_top_k(),
            parallel_regions: false,
            detector_passes: default_detector_passes(),
        }
    }
}

impl RecognitionConfig {
    /// Load and validate a YAML configuration file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, RecognitionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RecognitionError::Processing(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: RecognitionConfig = serde_yaml::from_str(&contents).map_err(|e| {
            RecognitionError::Processing(format!("Failed to parse YAML: {e}"))
        })?;
        config.validate()?;

        info!(
            "Loaded recognition config from {} ({} detector passes)",
            path.display(),
            config.detector_passes.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RecognitionError> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(RecognitionError::Configuration(format!(
                "iou_threshold must be in [0, 1], got {}",
                self.iou_threshold
            )));
        }
        if !self.expand_ratio.is_finite() || self.expand_ratio < 0.0 {
            return Err(RecognitionError::Configuration(format!(
                "expand_ratio must be finite and >= 0, got {}",
                self.expand_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.fallback_confidence) {
            return Err(RecognitionError::Configuration(format!(
                "fallback_confidence must be in [0, 1], got {}",
                self.fallback_confidence
            )));
        }
        if self.top_k == 0 {
            return Err(RecognitionError::Configuration(
                "top_k must be at least 1".into(),
            ));
        }
        for (index, pass) in self.detector_passes.iter().enumerate() {
            pass.validate().map_err(|e| {
                RecognitionError::Configuration(format!("detector pass {index}: {e}"))
            })?;
        }
        Ok(())
    }
}
