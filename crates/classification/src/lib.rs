//! Character classification over a fixed roster
//!
//! Provides the classifier contract used by the recognition pipeline, the
//! label catalog (ordered class names plus human-readable display names), and
//! an ONNX Runtime classifier for the exported ResNet model.
//!
//! # Example
//! ```no_run
//! use character_recognition_classification::{
//!     ClassifierConfig, LabelSet, OnnxCharacterClassifier, RegionClassifier,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let labels = LabelSet::from_json("models/class_names.json")?;
//! let classifier =
//!     OnnxCharacterClassifier::new("models/classifier.onnx", labels, ClassifierConfig::default())?;
//!
//! let img = image::open("crop.jpg")?.to_rgb8();
//! for entry in classifier.classify(&img)? {
//!     println!("{}: {:.2}%", entry.label, entry.probability * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod labels;
pub mod onnx;

pub use labels::{display_name, LabelSet, ModelInfo, DISPLAY_NAMES};
pub use onnx::{ClassifierConfig, OnnxCharacterClassifier};

use character_recognition_common::{LabelProbability, ProcessingError};
use image::RgbImage;
use thiserror::Error;

/// Classifier contract: one probability per label of a closed, non-empty set
///
/// Entries may come back in any order; they must cover the full label set and
/// sum to 1.0.
pub trait RegionClassifier: Send + Sync {
    fn classify(&self, region: &RgbImage) -> Result<Vec<LabelProbability>, ClassificationError>;

    /// Size of the label set this classifier covers
    fn label_count(&self) -> usize;
}

impl<T: RegionClassifier + ?Sized> RegionClassifier for Box<T> {
    fn classify(&self, region: &RgbImage) -> Result<Vec<LabelProbability>, ClassificationError> {
        (**self).classify(region)
    }

    fn label_count(&self) -> usize {
        (**self).label_count()
    }
}

/// Errors that can occur during classification
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Invalid label file: {0}")]
    LabelFile(String),

    #[error("Label set is empty")]
    EmptyLabelSet,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),
}

impl From<ClassificationError> for ProcessingError {
    fn from(err: ClassificationError) -> Self {
        match err {
            ClassificationError::Io(e) => ProcessingError::IoError(e),
            ClassificationError::EmptyLabelSet | ClassificationError::LabelFile(_) => {
                ProcessingError::Configuration(err.to_string())
            }
            other => ProcessingError::Model(other.to_string()),
        }
    }
}

/// Apply softmax function to convert logits to probabilities
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum_exps: f32 = exps.iter().sum();
    exps.iter().map(|&x| x / sum_exps).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax() {
        let logits = vec![1.0, 2.0, 3.0];
        let probs = softmax(&logits);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1]);
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let probs = softmax(&[1000.0, 1001.0]);
        let shifted = softmax(&[0.0, 1.0]);
        assert!((probs[0] - shifted[0]).abs() < 1e-6);
        assert!((probs[1] - shifted[1]).abs() < 1e-6);
    }

    #[test]
    fn test_error_conversion() {
        let err: ProcessingError = ClassificationError::EmptyLabelSet.into();
        assert!(matches!(err, ProcessingError::Configuration(_)));

        let err: ProcessingError = ClassificationError::Inference("boom".into()).into();
        assert!(matches!(err, ProcessingError::Model(_)));
    }
}
