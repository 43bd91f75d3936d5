use std::fmt;

use crate::pose::PoseClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    PoseEstimator,
    PoseClassifier,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::PoseEstimator => f.write_str("pose estimation"),
            ModelKind::PoseClassifier => f.write_str("pose classification"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("failed to load {model} model: {message}")]
    ModelLoad { model: ModelKind, message: String },

    #[error("practice session already running")]
    AlreadyRunning,

    #[error("{0} cannot be selected as a target pose")]
    UnselectablePose(PoseClass),

    #[error("no target pose selected")]
    NoTarget,
}
