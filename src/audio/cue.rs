use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

/// Counting cue: a short tone at the start of every second, silence between.
pub struct CountCue {
    freq: f32,
    sample_rate: u32,
    beep_samples: u32,
    num_sample: u32,
}

impl CountCue {
    pub fn new(freq: f32) -> Self {
        let sample_rate = 44100;
        Self {
            freq,
            sample_rate,
            beep_samples: sample_rate / 12,
            num_sample: 0,
        }
    }
}

impl Iterator for CountCue {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.num_sample % self.sample_rate;
        self.num_sample = self.num_sample.wrapping_add(1);

        if pos >= self.beep_samples {
            return Some(0.0);
        }

        let t = pos as f32 / self.sample_rate as f32;
        // Linear fade-out avoids a click at the end of each beep.
        let envelope = 1.0 - pos as f32 / self.beep_samples as f32;
        Some((2.0 * PI * self.freq * t).sin() * envelope * 0.3)
    }
}

impl Source for CountCue {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
