use serde::{Deserialize, Serialize};

/// The 17 landmarks of the MoveNet skeleton, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

pub const KEYPOINT_COUNT: usize = 17;

impl BodyPart {
    pub const ALL: [BodyPart; KEYPOINT_COUNT] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_eye(self) -> bool {
        matches!(self, BodyPart::LeftEye | BodyPart::RightEye)
    }

    /// Parts this one is drawn connected to. Each segment is listed once.
    pub fn connections(self) -> &'static [BodyPart] {
        use BodyPart::*;
        match self {
            Nose => &[LeftEar, RightEar],
            LeftEar => &[LeftShoulder],
            RightEar => &[RightShoulder],
            LeftShoulder => &[RightShoulder, LeftElbow, LeftHip],
            RightShoulder => &[RightElbow, RightHip],
            LeftElbow => &[LeftWrist],
            RightElbow => &[RightWrist],
            LeftHip => &[LeftKnee, RightHip],
            RightHip => &[RightKnee],
            LeftKnee => &[LeftAnkle],
            RightKnee => &[RightAnkle],
            LeftEye | RightEye | LeftWrist | RightWrist | LeftAnkle | RightAnkle => &[],
        }
    }
}

/// One landmark estimate as produced by the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: BodyPart,
    pub x: f32,
    pub y: f32,
    /// Model confidence in [0, 1].
    pub score: f32,
}

impl Keypoint {
    pub fn new(name: BodyPart, x: f32, y: f32, score: f32) -> Self {
        Self { name, x, y, score }
    }

    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// A full frame of keypoints, indexed by `BodyPart`.
pub type Skeleton = [Keypoint; KEYPOINT_COUNT];

/// Orders a model's keypoint list into a `Skeleton`.
///
/// Models are not trusted to emit parts in index order, so each keypoint is
/// placed by name. Returns `None` unless every part appears exactly once.
pub fn skeleton_from_keypoints(keypoints: &[Keypoint]) -> Option<Skeleton> {
    if keypoints.len() != KEYPOINT_COUNT {
        return None;
    }

    let mut slots: [Option<Keypoint>; KEYPOINT_COUNT] = [None; KEYPOINT_COUNT];
    for keypoint in keypoints {
        let slot = &mut slots[keypoint.name.index()];
        if slot.is_some() {
            return None;
        }
        *slot = Some(*keypoint);
    }

    let mut skeleton = [Keypoint::new(BodyPart::Nose, 0.0, 0.0, 0.0); KEYPOINT_COUNT];
    for (index, slot) in slots.into_iter().enumerate() {
        skeleton[index] = slot?;
    }
    Some(skeleton)
}
