//! Per-region recognition and confidence fusion

use crate::RecognitionError;
use character_recognition_classification::{display_name, RegionClassifier};
use character_recognition_common::{LabelProbability, Rectangle};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Weight recognition confidence keeps regardless of detection quality
const RECOGNITION_FLOOR: f32 = 0.7;
/// Share of the recognition confidence modulated by detection confidence
const DETECTION_WEIGHT: f32 = 0.3;

/// Combine confidences: `recognition * (0.7 + 0.3 * detection)`
///
/// Never exceeds `recognition`; equal to it only when `detection == 1`.
#[must_use]
#[inline]
pub fn fuse(detection_confidence: f32, recognition_confidence: f32) -> f32 {
    recognition_confidence * (RECOGNITION_FLOOR + DETECTION_WEIGHT * detection_confidence)
}

/// One ranked label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub label: String,
    pub display_name: String,
    pub probability: f32,
}

/// Full label distribution for one region, most probable first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    entries: Vec<ClassificationEntry>,
}

impl ClassificationResult {
    /// Rank classifier output; an empty list is a configuration error
    pub fn from_probabilities(
        probabilities: Vec<LabelProbability>,
    ) -> Result<Self, RecognitionError> {
        if probabilities.is_empty() {
            return Err(RecognitionError::Configuration(
                "classifier returned an empty label set".into(),
            ));
        }

        let mut entries: Vec<ClassificationEntry> = probabilities
            .into_iter()
            .map(|p| ClassificationEntry {
                display_name: display_name(&p.label).to_string(),
                label: p.label,
                probability: p.probability,
            })
            .collect();

        entries.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Ok(Self { entries })
    }

    /// Most probable entry
    #[must_use]
    pub fn best(&self) -> &ClassificationEntry {
        // Non-empty by construction
        &self.entries[0]
    }

    /// Up to `k` leading entries
    #[must_use]
    pub fn top(&self, k: usize) -> &[ClassificationEntry] {
        &self.entries[..k.min(self.entries.len())]
    }

    #[must_use]
    pub fn entries(&self) -> &[ClassificationEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<ClassificationEntry> {
        self.entries
    }
}

/// Crops regions out of a source image and classifies them
pub struct RegionRecognizer<'a, C: ?Sized> {
    classifier: &'a C,
}

impl<'a, C: RegionClassifier + ?Sized> RegionRecognizer<'a, C> {
    #[must_use]
    pub fn new(classifier: &'a C) -> Self {
        Self { classifier }
    }

    /// Classify an already cropped region
    pub fn recognize(&self, region: &RgbImage) -> Result<ClassificationResult, RecognitionError> {
        self.recognize_at(region, Rectangle::full_image(region.width(), region.height()))
    }

    /// Crop `rect` out of `image` (which is left untouched) and classify it
    pub fn recognize_rect(
        &self,
        image: &RgbImage,
        rect: Rectangle,
    ) -> Result<ClassificationResult, RecognitionError> {
        let crop = image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height)
            .to_image();
        self.recognize_at(&crop, rect)
    }

    fn recognize_at(
        &self,
        crop: &RgbImage,
        region: Rectangle,
    ) -> Result<ClassificationResult, RecognitionError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(RecognitionError::InvalidInput(format!(
                "region {region:?} has zero area"
            )));
        }
        let probabilities = self
            .classifier
            .classify(crop)
            .map_err(|source| RecognitionError::RegionProcessing { region, source })?;
        ClassificationResult::from_probabilities(probabilities)
    }
}
