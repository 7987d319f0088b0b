//! Result assembly: expand, recognize, fuse, rank

use crate::expander::expand;
use crate::merger::MergedRegion;
use crate::recognizer::{fuse, ClassificationEntry, RegionRecognizer};
use crate::{check_dimensions, RecognitionConfig, RecognitionError};
use character_recognition_classification::RegionClassifier;
use character_recognition_common::Rectangle;
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounding box as percentages of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPercent {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxPercent {
    #[must_use]
    pub fn from_bbox(bbox: &Rectangle, image_width: u32, image_height: u32) -> Self {
        let w = image_width as f32;
        let h = image_height as f32;
        Self {
            x: bbox.x as f32 / w * 100.0,
            y: bbox.y as f32 / h * 100.0,
            width: bbox.width as f32 / w * 100.0,
            height: bbox.height as f32 / h * 100.0,
        }
    }
}

/// One recognized character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 1-based rank by combined confidence
    pub id: usize,
    /// Expanded region that was classified
    pub bbox: Rectangle,
    pub bbox_percent: BoxPercent,
    pub label: String,
    pub display_name: String,
    pub combined_confidence: f32,
    pub detection_confidence: f32,
    pub recognition_confidence: f32,
    /// Leading ranked labels (`top_k`, 5 by default)
    pub top5: Vec<ClassificationEntry>,
}

/// Turn merged regions into ranked detections
///
/// An empty `regions` list is replaced by one full-image region with
/// `fallback_confidence`, so a non-degenerate image always yields at least
/// one detection. A zero-area image is `InvalidInput` before any classifier
/// call. Any classifier failure fails the whole call.
pub fn assemble<C: RegionClassifier + ?Sized>(
    image: &RgbImage,
    regions: Vec<MergedRegion>,
    recognizer: &RegionRecognizer<'_, C>,
    config: &RecognitionConfig,
) -> Result<Vec<Detection>, RecognitionError> {
    check_dimensions(image)?;
    let (width, height) = image.dimensions();

    let regions = if regions.is_empty() {
        debug!(
            "No regions proposed, falling back to the full {}x{} image",
            width, height
        );
        vec![MergedRegion {
            rect: Rectangle::full_image(width, height),
            detection_confidence: config.fallback_confidence,
        }]
    } else {
        regions
    };

    let build = |region: &MergedRegion| -> Result<Detection, RecognitionError> {
        let bbox = expand(&region.rect, width, height, config.expand_ratio);
        let result = recognizer.recognize_rect(image, bbox)?;
        let best = result.best();

        Ok(Detection {
            id: 0,
            bbox,
            bbox_percent: BoxPercent::from_bbox(&bbox, width, height),
            label: best.label.clone(),
            display_name: best.display_name.clone(),
            combined_confidence: fuse(region.detection_confidence, best.probability),
            detection_confidence: region.detection_confidence,
            recognition_confidence: best.probability,
            top5: result.top(config.top_k).to_vec(),
        })
    };

    let mut detections = if config.parallel_regions {
        regions
            .par_iter()
            .map(build)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        regions.iter().map(build).collect::<Result<Vec<_>, _>>()?
    };

    // Stable: equal confidences keep region order
    detections.sort_by(|a, b| b.combined_confidence.total_cmp(&a.combined_confidence));
    for (index, detection) in detections.iter_mut().enumerate() {
        detection.id = index + 1;
    }

    Ok(detections)
}
