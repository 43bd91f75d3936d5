use std::sync::Arc;

use anyhow::{bail, Result};

use super::classes::{PoseClass, CLASS_COUNT};
use super::keypoint::Keypoint;
use super::normalize::Embedding;
use crate::frame::Frame;

pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.97;

/// Keypoint model: one frame in, named keypoints out.
///
/// An empty result means no person was found in the frame.
pub trait PoseEstimator: Send + Sync {
    fn estimate(&self, frame: &Frame) -> Result<Vec<Keypoint>>;
}

/// Classification model: one embedding in, one probability per `PoseClass`
/// (indexed by `PoseClass::class_index`) out.
pub trait PoseClassifier: Send + Sync {
    fn predict(&self, embedding: &Embedding) -> Result<Vec<f32>>;
}

/// Extracts the target pose's probability and applies the acceptance
/// threshold.
#[derive(Clone)]
pub struct PoseMatcher {
    classifier: Arc<dyn PoseClassifier>,
    threshold: f32,
}

impl PoseMatcher {
    pub fn new(classifier: Arc<dyn PoseClassifier>, threshold: f32) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Probability the classifier assigns to `target`.
    pub fn classify(&self, embedding: &Embedding, target: PoseClass) -> Result<f32> {
        let probabilities = self.classifier.predict(embedding)?;
        if probabilities.len() != CLASS_COUNT {
            bail!(
                "classifier returned {} probabilities, expected {}",
                probabilities.len(),
                CLASS_COUNT
            );
        }

        let confidence = probabilities[target.class_index()];
        if !confidence.is_finite() {
            bail!("classifier returned non-finite confidence {confidence} for {target}");
        }
        Ok(confidence)
    }

    pub fn is_match(&self, confidence: f32) -> bool {
        confidence > self.threshold
    }
}

/// Maps a matched confidence in (threshold, 1] linearly onto 0..=100.
pub fn accuracy_percent(confidence: f32, threshold: f32) -> f32 {
    let span = (1.0 - threshold).max(f32::EPSILON);
    (((confidence - threshold) / span) * 100.0).round().clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f32>);

    impl PoseClassifier for Fixed {
        fn predict(&self, _embedding: &Embedding) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn probs_with(target: PoseClass, value: f32) -> Vec<f32> {
        let mut probs = vec![0.0; CLASS_COUNT];
        probs[target.class_index()] = value;
        probs
    }

    #[test]
    fn test_classify_reads_target_index() {
        let matcher = PoseMatcher::new(
            Arc::new(Fixed(probs_with(PoseClass::Warrior, 0.99))),
            DEFAULT_MATCH_THRESHOLD,
        );
        let emb = [0.0; 34];
        assert_eq!(matcher.classify(&emb, PoseClass::Warrior).unwrap(), 0.99);
        assert_eq!(matcher.classify(&emb, PoseClass::Tree).unwrap(), 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let matcher = PoseMatcher::new(Arc::new(Fixed(vec![])), DEFAULT_MATCH_THRESHOLD);
        assert!(!matcher.is_match(0.97));
        assert!(matcher.is_match(0.9701));
    }

    #[test]
    fn test_wrong_vector_length_is_an_error() {
        let matcher = PoseMatcher::new(Arc::new(Fixed(vec![1.0; 3])), DEFAULT_MATCH_THRESHOLD);
        assert!(matcher.classify(&[0.0; 34], PoseClass::Tree).is_err());
    }

    #[test]
    fn test_accuracy_percent_scaling() {
        assert_eq!(accuracy_percent(1.0, 0.97), 100.0);
        assert_eq!(accuracy_percent(0.985, 0.97), 50.0);
        assert_eq!(accuracy_percent(0.97, 0.97), 0.0);
    }
}
