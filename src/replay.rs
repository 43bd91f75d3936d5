//! Recorded pose traces that stand in for the camera and both models.
//!
//! A trace is JSON lines, one per frame:
//! `{"keypoints": [{"name": "nose", "x": 0.5, "y": 0.2, "score": 0.9}, ...], "probabilities": [8 floats]}`.
//! An empty (or missing) `keypoints` array means no person in that frame.

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use serde::Deserialize;

use crate::{
    frame::{Frame, FrameSource},
    pose::{Embedding, Keypoint, PoseClassifier, PoseEstimator},
    session::ModelLoader,
};

#[derive(Debug, Clone, Deserialize)]
pub struct TraceFrame {
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub probabilities: Vec<f32>,
}

#[derive(Debug)]
pub struct ReplayTrace {
    frames: Vec<TraceFrame>,
    cursor: AtomicUsize,
    last_estimated: AtomicUsize,
}

impl ReplayTrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
            last_estimated: AtomicUsize::new(0),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame: TraceFrame = serde_json::from_str(line)
                .with_context(|| format!("invalid trace line {}", line_no + 1))?;
            frames.push(frame);
        }
        Ok(Self::new(frames))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once every frame has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::SeqCst) >= self.frames.len()
    }

    fn frame_at(&self, index: usize) -> Result<&TraceFrame> {
        self.frames
            .get(index)
            .ok_or_else(|| anyhow!("trace has no frame {index}"))
    }
}

impl FrameSource for ReplayTrace {
    fn next_frame(&self) -> Option<Frame> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        if index >= self.frames.len() {
            self.cursor.store(self.frames.len(), Ordering::SeqCst);
            return None;
        }
        Some(Frame::new(index as u64, DynamicImage::new_rgb8(1, 1)))
    }
}

impl PoseEstimator for ReplayTrace {
    fn estimate(&self, frame: &Frame) -> Result<Vec<Keypoint>> {
        let index = frame.sequence as usize;
        let keypoints = self.frame_at(index)?.keypoints.clone();
        self.last_estimated.store(index, Ordering::SeqCst);
        Ok(keypoints)
    }
}

impl PoseClassifier for ReplayTrace {
    // Classification always follows the estimate for the same frame.
    fn predict(&self, _embedding: &Embedding) -> Result<Vec<f32>> {
        let index = self.last_estimated.load(Ordering::SeqCst);
        Ok(self.frame_at(index)?.probabilities.clone())
    }
}

/// Hands the same trace out as both models.
pub struct ReplayLoader {
    trace: Arc<ReplayTrace>,
}

impl ReplayLoader {
    pub fn new(trace: Arc<ReplayTrace>) -> Self {
        Self { trace }
    }
}

impl ModelLoader for ReplayLoader {
    fn load_estimator(&self) -> Result<Arc<dyn PoseEstimator>> {
        Ok(self.trace.clone())
    }

    fn load_classifier(&self) -> Result<Arc<dyn PoseClassifier>> {
        if self.trace.is_empty() {
            return Err(anyhow!("trace contains no frames"));
        }
        Ok(self.trace.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::BodyPart;

    fn line(score: f32, probabilities: &str) -> String {
        let keypoints: Vec<String> = BodyPart::ALL
            .iter()
            .enumerate()
            .map(|(i, part)| {
                format!(
                    r#"{{"name":"{}","x":{},"y":{},"score":{}}}"#,
                    serde_json::to_value(part).unwrap().as_str().unwrap(),
                    i as f32 * 0.05,
                    i as f32 * 0.03,
                    score
                )
            })
            .collect();
        format!(
            r#"{{"keypoints":[{}],"probabilities":{}}}"#,
            keypoints.join(","),
            probabilities
        )
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let contents = format!(
            "{}\n\n{}\n{{\"keypoints\":[]}}\n",
            line(0.9, "[0,0,0,0,0,0,1,0]"),
            line(0.2, "[1,0,0,0,0,0,0,0]")
        );
        let trace = ReplayTrace::parse(&contents).unwrap();
        assert_eq!(trace.len(), 3);
        assert!(trace.frames[2].keypoints.is_empty());
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let err = ReplayTrace::parse("{\"keypoints\": 3}").unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn test_frames_then_exhaustion() {
        let contents = format!("{}\n{}", line(0.9, "[]"), line(0.9, "[]"));
        let trace = ReplayTrace::parse(&contents).unwrap();

        assert_eq!(trace.next_frame().unwrap().sequence, 0);
        assert!(!trace.is_exhausted());
        assert_eq!(trace.next_frame().unwrap().sequence, 1);
        assert!(trace.is_exhausted());
        assert!(trace.next_frame().is_none());
        assert!(trace.next_frame().is_none());
    }

    #[test]
    fn test_classifier_follows_last_estimate() {
        let contents = format!(
            "{}\n{}",
            line(0.9, "[0,0,0,0,0,0,0.5,0]"),
            line(0.9, "[0,0,0,0,0,0,0.99,0]")
        );
        let trace = ReplayTrace::parse(&contents).unwrap();
        let _ = trace.next_frame();
        let second = trace.next_frame().unwrap();

        let keypoints = trace.estimate(&second).unwrap();
        assert_eq!(keypoints.len(), 17);
        let probabilities = trace.predict(&[0.0; 34]).unwrap();
        assert_eq!(probabilities[6], 0.99);
    }
}
