use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::SessionRecord;
use crate::pose::PoseClass;

/// Every completed session is one full hold.
pub const SESSION_MINUTES: f64 = 0.5;
pub const DEFAULT_ACCURACY_CAPACITY: usize = 100;

/// Builds the record for a completed hold.
///
/// An empty sample list yields accuracy 0.
pub fn finalize(samples: &[f32], target: PoseClass, date: DateTime<Utc>) -> SessionRecord {
    let accuracy = if samples.is_empty() {
        0.0
    } else {
        let sum: f64 = samples.iter().map(|s| *s as f64).sum();
        (sum / samples.len() as f64).round()
    };

    let intensity = target.intensity();
    let calories = (SESSION_MINUTES * intensity.calories_per_minute()).round();

    SessionRecord {
        id: Uuid::new_v4().to_string(),
        pose: target,
        minutes: SESSION_MINUTES,
        accuracy,
        calories,
        date,
        intensity,
    }
}

/// Bounded buffer of per-tick accuracy samples for the current hold.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SessionRecorder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Emits the record for `target` and empties the buffer.
    pub fn finalize(&mut self, target: PoseClass, date: DateTime<Utc>) -> SessionRecord {
        let samples: Vec<f32> = self.samples.drain(..).collect();
        finalize(&samples, target, date)
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_ACCURACY_CAPACITY)
    }
}
