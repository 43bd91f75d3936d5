use serde::{Deserialize, Serialize};

use super::keypoint::{BodyPart, Skeleton};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkeletonColor {
    White,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySegment {
    pub from: [f32; 2],
    pub to: [f32; 2],
}

/// What the presentation layer should draw over the video for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub points: Vec<OverlayPoint>,
    pub segments: Vec<OverlaySegment>,
    pub color: SkeletonColor,
}

/// Confident keypoints (eyes excluded) and the segments that start at them.
/// The far end of a segment is drawn whatever its own score.
pub fn build_overlay(skeleton: &Skeleton, score_threshold: f32, color: SkeletonColor) -> Overlay {
    let mut points = Vec::new();
    let mut segments = Vec::new();

    for keypoint in skeleton.iter() {
        if keypoint.score <= score_threshold || keypoint.name.is_eye() {
            continue;
        }
        points.push(OverlayPoint {
            part: keypoint.name,
            x: keypoint.x,
            y: keypoint.y,
        });
        for other in keypoint.name.connections() {
            segments.push(OverlaySegment {
                from: keypoint.position(),
                to: skeleton[other.index()].position(),
            });
        }
    }

    Overlay {
        points,
        segments,
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::keypoint::{Keypoint, KEYPOINT_COUNT};

    fn confident_skeleton() -> Skeleton {
        let mut skeleton = [Keypoint::new(BodyPart::Nose, 0.0, 0.0, 0.0); KEYPOINT_COUNT];
        for part in BodyPart::ALL {
            skeleton[part.index()] = Keypoint::new(part, part.index() as f32, 1.0, 0.9);
        }
        skeleton
    }

    #[test]
    fn test_full_overlay_skips_eyes() {
        let overlay = build_overlay(&confident_skeleton(), 0.4, SkeletonColor::Green);
        assert_eq!(overlay.points.len(), 15);
        assert_eq!(overlay.segments.len(), 16);
        assert!(overlay.points.iter().all(|p| !p.part.is_eye()));
        assert_eq!(overlay.color, SkeletonColor::Green);
    }

    #[test]
    fn test_low_confidence_source_drops_its_segments() {
        let mut skeleton = confident_skeleton();
        skeleton[BodyPart::LeftShoulder.index()].score = 0.1;
        let overlay = build_overlay(&skeleton, 0.4, SkeletonColor::White);
        assert_eq!(overlay.points.len(), 14);
        // left shoulder owned three segments
        assert_eq!(overlay.segments.len(), 13);
    }
}
