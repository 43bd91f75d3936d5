use super::keypoint::{BodyPart, KEYPOINT_COUNT};

pub const EMBEDDING_LEN: usize = KEYPOINT_COUNT * 2;

/// Flattened, hip-centred and size-normalised `[x0, y0, x1, y1, ...]`.
pub type Embedding = [f32; EMBEDDING_LEN];

/// Torso length is scaled by this to estimate overall pose size.
pub const TORSO_SIZE_MULTIPLIER: f32 = 2.5;

/// Floor for the pose size so a collapsed skeleton never divides by zero.
const MIN_POSE_SIZE: f32 = 1e-6;

fn midpoint(points: &[[f32; 2]; KEYPOINT_COUNT], left: BodyPart, right: BodyPart) -> [f32; 2] {
    let l = points[left.index()];
    let r = points[right.index()];
    [l[0] * 0.5 + r[0] * 0.5, l[1] * 0.5 + r[1] * 0.5]
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Pose size: the larger of the scaled torso length and the farthest point
/// from the hip centre.
pub fn pose_size(points: &[[f32; 2]; KEYPOINT_COUNT]) -> f32 {
    let hips = midpoint(points, BodyPart::LeftHip, BodyPart::RightHip);
    let shoulders = midpoint(points, BodyPart::LeftShoulder, BodyPart::RightShoulder);
    let torso_size = distance(shoulders, hips);

    let max_dist = points
        .iter()
        .map(|p| distance(*p, hips))
        .fold(0.0_f32, f32::max);

    (torso_size * TORSO_SIZE_MULTIPLIER).max(max_dist)
}

/// Converts raw keypoint positions into a translation and scale invariant
/// embedding for the pose classifier.
pub fn normalize(points: &[[f32; 2]; KEYPOINT_COUNT]) -> Embedding {
    let center = midpoint(points, BodyPart::LeftHip, BodyPart::RightHip);
    let size = pose_size(points).max(MIN_POSE_SIZE);

    let mut embedding = [0.0_f32; EMBEDDING_LEN];
    for (i, point) in points.iter().enumerate() {
        embedding[i * 2] = (point[0] - center[0]) / size;
        embedding[i * 2 + 1] = (point[1] - center[1]) / size;
    }
    embedding
}
