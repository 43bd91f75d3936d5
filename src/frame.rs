use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub image: Arc<DynamicImage>,
}

impl Frame {
    pub fn new(sequence: u64, image: DynamicImage) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            image: Arc::new(image),
        }
    }
}

/// Camera side of the pipeline.
///
/// Returns `None` while no frame is ready (camera warming up, permission
/// denied, device unplugged); that tick is skipped.
pub trait FrameSource: Send + Sync {
    fn next_frame(&self) -> Option<Frame>;
}
