//! Region proposal: multi-pass detection with area-based confidence

use crate::{check_dimensions, RecognitionError};
use character_recognition_common::Rectangle;
use character_recognition_region_detection::{DetectorParams, RegionDetector};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One detector hit with its heuristic confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub rect: Rectangle,
    /// Relative-area heuristic in [0, 1]; only orders candidates for suppression
    pub detection_confidence: f32,
}

impl RawCandidate {
    #[must_use]
    pub fn new(rect: Rectangle, detection_confidence: f32) -> Self {
        Self {
            rect,
            detection_confidence,
        }
    }
}

/// `min(1, area / (0.5 * image_area))`
#[must_use]
pub fn detection_confidence(rect: &Rectangle, image_width: u32, image_height: u32) -> f32 {
    let image_area = Rectangle::full_image(image_width, image_height).area();
    if image_area == 0 {
        return 0.0;
    }
    (rect.area() as f64 / (0.5 * image_area as f64)).min(1.0) as f32
}

/// Runs the detector once per parameter set and concatenates the hits
pub struct RegionProposer<'a, D: ?Sized> {
    detector: &'a D,
    passes: &'a [DetectorParams],
}

impl<'a, D: RegionDetector + ?Sized> RegionProposer<'a, D> {
    #[must_use]
    pub fn new(detector: &'a D, passes: &'a [DetectorParams]) -> Self {
        Self { detector, passes }
    }

    /// All hits in pass order, no deduplication; may be empty
    ///
    /// A failing pass is logged and contributes nothing. Hits are clipped to
    /// the image and dropped when nothing remains. A zero-area image is
    /// `InvalidInput` and the detector is never called.
    pub fn propose(&self, image: &RgbImage) -> Result<Vec<RawCandidate>, RecognitionError> {
        check_dimensions(image)?;
        let (width, height) = image.dimensions();
        let mut candidates = Vec::new();

        for (index, params) in self.passes.iter().enumerate() {
            let hits = match self.detector.detect(image, params) {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Detector pass {} ({:?}) failed: {}", index, params, e);
                    continue;
                }
            };

            let before = candidates.len();
            candidates.extend(hits.iter().filter_map(|hit| {
                let rect = hit.clip_to(width, height)?;
                Some(RawCandidate::new(
                    rect,
                    detection_confidence(&rect, width, height),
                ))
            }));

            debug!(
                "Detector pass {}: {} hits, {} candidates kept",
                index,
                hits.len(),
                candidates.len() - before
            );
        }

        Ok(candidates)
    }
}
