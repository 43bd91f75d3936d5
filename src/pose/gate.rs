use super::keypoint::{Skeleton, KEYPOINT_COUNT};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.4;
pub const DEFAULT_MAX_LOW_CONFIDENCE: usize = 4;

/// Result of screening one frame of keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    /// Raw positions of every keypoint, low-confidence ones included.
    pub usable: [[f32; 2]; KEYPOINT_COUNT],
    pub low_confidence_count: usize,
}

impl GateResult {
    /// Whether enough of the body is visible to attempt classification.
    pub fn is_detected(&self, max_low_confidence: usize) -> bool {
        self.low_confidence_count <= max_low_confidence
    }
}

/// Counts keypoints at or below `score_threshold`. Positions pass through
/// untouched; noisy points are not zeroed or interpolated.
pub fn filter_and_count(skeleton: &Skeleton, score_threshold: f32) -> GateResult {
    let mut usable = [[0.0_f32; 2]; KEYPOINT_COUNT];
    let mut low_confidence_count = 0;

    for (slot, keypoint) in usable.iter_mut().zip(skeleton.iter()) {
        if keypoint.score <= score_threshold {
            low_confidence_count += 1;
        }
        *slot = keypoint.position();
    }

    GateResult {
        usable,
        low_confidence_count,
    }
}
