pub mod classes;
pub mod gate;
pub mod keypoint;
pub mod matcher;
pub mod normalize;
pub mod skeleton;

pub use classes::{Intensity, PoseClass, CLASS_COUNT};
pub use gate::{filter_and_count, GateResult};
pub use keypoint::{skeleton_from_keypoints, BodyPart, Keypoint, Skeleton, KEYPOINT_COUNT};
pub use matcher::{accuracy_percent, PoseClassifier, PoseEstimator, PoseMatcher};
pub use normalize::{normalize, Embedding, EMBEDDING_LEN};
pub use skeleton::{build_overlay, Overlay, SkeletonColor};
