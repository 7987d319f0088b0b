//! Candidate merging (greedy `IoU` non-maximum suppression)

use crate::proposer::RawCandidate;
use character_recognition_common::Rectangle;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cluster representative; keeps its own box, never an average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub rect: Rectangle,
    pub detection_confidence: f32,
}

impl From<RawCandidate> for MergedRegion {
    fn from(candidate: RawCandidate) -> Self {
        Self {
            rect: candidate.rect,
            detection_confidence: candidate.detection_confidence,
        }
    }
}

/// Keep the most confident candidate of each overlapping cluster
///
/// Candidates are stable-sorted by confidence descending. Each survivor
/// suppresses every later candidate whose `IoU` with it is strictly greater
/// than `iou_threshold`. Output is in emission order.
#[must_use]
pub fn merge(mut candidates: Vec<RawCandidate>, iou_threshold: f32) -> Vec<MergedRegion> {
    if candidates.is_empty() {
        return Vec::new();
    }

    debug!(
        "Merging {} candidates (IoU threshold {})",
        candidates.len(),
        iou_threshold
    );

    candidates.sort_by(|a, b| b.detection_confidence.total_cmp(&a.detection_confidence));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(MergedRegion::from(candidates[i]));

        for j in (i + 1)..candidates.len() {
            if suppressed[j] {
                continue;
            }

            if candidates[i].rect.iou(&candidates[j].rect) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    debug!("Merge kept {} regions", keep.len());
    keep
}
