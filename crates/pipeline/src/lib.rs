//! Character recognition pipeline
//!
//! Turns one image into a ranked list of per-character detections:
//!
//! 1. [`proposer`]: run the region detector with several parameter sets and
//!    score every hit by its relative area
//! 2. [`merger`]: greedy `IoU` non-maximum suppression
//! 3. [`expander`]: pad each surviving region for context
//! 4. [`recognizer`]: classify each padded crop and fuse confidences
//! 5. [`assembler`]: rank detections and assign ids
//!
//! When no region survives, the whole image is classified as one region, so
//! any non-degenerate image yields at least one detection.
//!
//! # Example
//! ```no_run
//! use character_recognition_classification::{ClassifierConfig, LabelSet, OnnxCharacterClassifier};
//! use character_recognition_pipeline::{CharacterRecognizer, RecognitionConfig};
//! use character_recognition_region_detection::{CascadeConfig, CascadeDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = CascadeDetector::from_file(
//!     "models/haarcascade_frontalface_default.xml",
//!     CascadeConfig::default(),
//! )?;
//! let labels = LabelSet::from_json("models/class_names.json")?;
//! let classifier =
//!     OnnxCharacterClassifier::new("models/classifier.onnx", labels, ClassifierConfig::default())?;
//!
//! let recognizer = CharacterRecognizer::new(detector, classifier, RecognitionConfig::default())?;
//! let report = recognizer.recognize(&image::open("screenshot.png")?.to_rgb8())?;
//!
//! for detection in &report.detections {
//!     println!(
//!         "#{} {} ({:.1}%)",
//!         detection.id,
//!         detection.display_name,
//!         detection.combined_confidence * 100.0
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod expander;
pub mod merger;
pub mod proposer;
pub mod recognizer;

pub use assembler::{assemble, BoxPercent, Detection};
pub use config::RecognitionConfig;
pub use error::RecognitionError;
pub use expander::expand;
pub use merger::{merge, MergedRegion};
pub use proposer::{detection_confidence, RawCandidate, RegionProposer};
pub use recognizer::{fuse, ClassificationEntry, ClassificationResult, RegionRecognizer};

use character_recognition_classification::RegionClassifier;
use character_recognition_region_detection::RegionDetector;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Output of one [`CharacterRecognizer::recognize`] call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionReport {
    pub detections: Vec<Detection>,
    /// Number of regions classified (equals `detections.len()`)
    pub num_regions: usize,
    /// Size of the classifier's label set
    pub total_classes: usize,
}

/// Owns the detector and classifier; read-only after construction
///
/// Safe to share across threads: independent images may be recognized in
/// parallel through `&self`.
pub struct CharacterRecognizer<D, C> {
    detector: D,
    classifier: C,
    config: RecognitionConfig,
}

impl<D: RegionDetector, C: RegionClassifier> CharacterRecognizer<D, C> {
    pub fn new(
        detector: D,
        classifier: C,
        config: RecognitionConfig,
    ) -> Result<Self, RecognitionError> {
        config.validate()?;
        if classifier.label_count() == 0 {
            return Err(RecognitionError::Configuration(
                "classifier has an empty label set".into(),
            ));
        }

        Ok(Self {
            detector,
            classifier,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    #[must_use]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Run the full pipeline on one image
    pub fn recognize(&self, image: &RgbImage) -> Result<RecognitionReport, RecognitionError> {
        check_dimensions(image)?;
        let start = Instant::now();

        let candidates =
            RegionProposer::new(&self.detector, &self.config.detector_passes).propose(image)?;
        let candidate_count = candidates.len();

        let regions = merge(candidates, self.config.iou_threshold);
        debug!(
            "{} candidates merged into {} regions",
            candidate_count,
            regions.len()
        );

        let recognizer = RegionRecognizer::new(&self.classifier);
        let detections = assemble(image, regions, &recognizer, &self.config)?;

        info!(
            "Recognized {} region(s) in {}x{} image in {:.2?}",
            detections.len(),
            image.width(),
            image.height(),
            start.elapsed()
        );

        Ok(RecognitionReport {
            num_regions: detections.len(),
            total_classes: self.classifier.label_count(),
            detections,
        })
    }

    /// Classify the whole image without region proposal, top `top_k` entries
    pub fn classify_whole_image(
        &self,
        image: &RgbImage,
    ) -> Result<Vec<ClassificationEntry>, RecognitionError> {
        check_dimensions(image)?;

        let mut entries = RegionRecognizer::new(&self.classifier)
            .recognize(image)?
            .into_entries();
        entries.truncate(self.config.top_k);
        Ok(entries)
    }
}

/// Zero-area images are rejected before any detector or classifier call
pub(crate) fn check_dimensions(image: &RgbImage) -> Result<(), RecognitionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RecognitionError::InvalidInput(format!(
            "image has zero area ({width}x{height})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_recognition_classification::ClassificationError;
    use character_recognition_common::{LabelProbability, Rectangle};
    use character_recognition_region_detection::{DetectionError, DetectorParams};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDetector {
        hits: Vec<Rectangle>,
        calls: AtomicUsize,
    }

    impl RegionDetector for CountingDetector {
        fn detect(
            &self,
            _image: &RgbImage,
            _params: &DetectorParams,
        ) -> Result<Vec<Rectangle>, DetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.clone())
        }
    }

    #[derive(Default)]
    struct CountingClassifier {
        labels: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl RegionClassifier for CountingClassifier {
        fn classify(
            &self,
            _region: &RgbImage,
        ) -> Result<Vec<LabelProbability>, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let p = 1.0 / self.labels.len() as f32;
            Ok(self
                .labels
                .iter()
                .map(|label| LabelProbability::new(*label, p))
                .collect())
        }

        fn label_count(&self) -> usize {
            self.labels.len()
        }
    }

    fn classifier() -> CountingClassifier {
        CountingClassifier {
            labels: vec!["qu", "luna"],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_label_set_is_configuration_error() {
        let result = CharacterRecognizer::new(
            CountingDetector::default(),
            CountingClassifier::default(),
            RecognitionConfig::default(),
        );
        assert!(matches!(result, Err(RecognitionError::Configuration(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RecognitionConfig {
            top_k: 0,
            ..Default::default()
        };
        let result = CharacterRecognizer::new(CountingDetector::default(), classifier(), config);
        assert!(matches!(result, Err(RecognitionError::Configuration(_))));
    }

    #[test]
    fn test_degenerate_image_fails_before_collaborators() {
        let recognizer = CharacterRecognizer::new(
            CountingDetector::default(),
            classifier(),
            RecognitionConfig::default(),
        )
        .unwrap();

        for image in [RgbImage::new(0, 10), RgbImage::new(10, 0)] {
            assert!(matches!(
                recognizer.recognize(&image),
                Err(RecognitionError::InvalidInput(_))
            ));
            assert!(matches!(
                recognizer.classify_whole_image(&image),
                Err(RecognitionError::InvalidInput(_))
            ));
        }
        assert_eq!(recognizer.detector().calls.load(Ordering::SeqCst), 0);
        assert_eq!(recognizer.classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_counts() {
        let detector = CountingDetector {
            hits: vec![Rectangle::new(0, 0, 20, 20), Rectangle::new(60, 60, 20, 20)],
            ..Default::default()
        };
        let recognizer =
            CharacterRecognizer::new(detector, classifier(), RecognitionConfig::default()).unwrap();

        let report = recognizer.recognize(&RgbImage::new(100, 100)).unwrap();
        // Same two hits from each of the three passes merge back to two regions
        assert_eq!(recognizer.detector().calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.num_regions, 2);
        assert_eq!(report.detections.len(), 2);
        assert_eq!(report.total_classes, 2);
        assert_eq!(recognizer.classifier().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_classify_whole_image_top_k() {
        let classifier = CountingClassifier {
            labels: vec!["a", "b", "c", "d", "e", "f", "g"],
            ..Default::default()
        };
        let recognizer = CharacterRecognizer::new(
            CountingDetector::default(),
            classifier,
            RecognitionConfig::default(),
        )
        .unwrap();

        let entries = recognizer.classify_whole_image(&RgbImage::new(5, 5)).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(recognizer.detector().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let recognizer = CharacterRecognizer::new(
            CountingDetector::default(),
            classifier(),
            RecognitionConfig::default(),
        )
        .unwrap();
        let report = recognizer.recognize(&RgbImage::new(8, 8)).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["num_regions"], 1);
        assert_eq!(json["total_classes"], 2);
        let detection = &json["detections"][0];
        for key in [
            "id",
            "bbox",
            "bbox_percent",
            "label",
            "display_name",
            "combined_confidence",
            "detection_confidence",
            "recognition_confidence",
            "top5",
        ] {
            assert!(detection.get(key).is_some(), "missing {key}");
        }
    }
}
