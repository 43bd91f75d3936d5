use serde::Serialize;
use std::time::Duration;

use crate::pose::PoseClass;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum HoldStatus {
    #[default]
    Idle,
    Sampling,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldConfig {
    pub tick_interval: Duration,
    pub hold_target: Duration,
    pub warning_after: Duration,
    pub breath_phase: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            hold_target: Duration::from_secs(30),
            warning_after: Duration::from_millis(3000),
            breath_phase: Duration::from_millis(4000),
        }
    }
}

/// What the pipeline concluded about one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Too few confident keypoints, no person, or a failed inference.
    Undetected,
    NotMatched,
    /// Target pose matched; `accuracy` is the 0-100 sample for this tick.
    Matched { accuracy: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HoldEvent {
    MatchStarted,
    MatchLost,
    WarningRaised,
    WarningCleared,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<HoldEvent>,
    pub accuracy_sample: Option<f32>,
}

impl TickOutcome {
    pub fn has(&self, event: HoldEvent) -> bool {
        self.events.contains(&event)
    }
}

/// Live match/hold state for the selected target pose.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldState {
    pub status: HoldStatus,
    pub target: Option<PoseClass>,
    pub matched: bool,
    pub not_matched_warning: bool,
    pub no_match_ms: u64,
    pub elapsed_hold_secs: f64,
    pub breath_phase: Option<BreathPhase>,
    /// Session-relative time of the last not-matched to matched edge.
    #[serde(skip)]
    pub hold_started_at: Option<Duration>,
    #[serde(skip)]
    config: HoldConfig,
}

impl HoldState {
    pub fn new(config: HoldConfig) -> Self {
        Self {
            status: HoldStatus::Idle,
            target: None,
            matched: false,
            not_matched_warning: false,
            no_match_ms: 0,
            elapsed_hold_secs: 0.0,
            breath_phase: None,
            hold_started_at: None,
            config,
        }
    }

    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    pub fn is_sampling(&self) -> bool {
        self.status == HoldStatus::Sampling
    }

    pub fn is_completed(&self) -> bool {
        self.status == HoldStatus::Completed
    }

    /// Enters Sampling/NotMatched for `target` with every counter zeroed.
    pub fn begin(&mut self, target: PoseClass) {
        *self = Self {
            status: HoldStatus::Sampling,
            target: Some(target),
            ..Self::new(self.config)
        };
    }

    /// Back to Idle with counters zeroed; the target is kept so a later
    /// start resumes the same pose.
    pub fn reset(&mut self) {
        let target = self.target;
        *self = Self {
            target,
            ..Self::new(self.config)
        };
    }

    /// Advances the machine by one tick. `now` is measured from the start of
    /// sampling. Ticks outside Sampling are ignored.
    pub fn tick(&mut self, observation: Observation, now: Duration) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.status != HoldStatus::Sampling {
            return outcome;
        }

        match observation {
            Observation::Undetected | Observation::NotMatched => {
                self.register_miss(&mut outcome);
            }
            Observation::Matched { accuracy } => {
                self.register_match(now, accuracy, &mut outcome);
            }
        }

        outcome
    }

    fn register_miss(&mut self, outcome: &mut TickOutcome) {
        if self.matched {
            outcome.events.push(HoldEvent::MatchLost);
        }
        self.matched = false;
        self.hold_started_at = None;
        self.breath_phase = None;

        let step = self.config.tick_interval.as_millis() as u64;
        self.no_match_ms = self.no_match_ms.saturating_add(step);
        if !self.not_matched_warning
            && self.no_match_ms >= self.config.warning_after.as_millis() as u64
        {
            self.not_matched_warning = true;
            outcome.events.push(HoldEvent::WarningRaised);
        }
    }

    fn register_match(&mut self, now: Duration, accuracy: f32, outcome: &mut TickOutcome) {
        self.no_match_ms = 0;
        if self.not_matched_warning {
            self.not_matched_warning = false;
            outcome.events.push(HoldEvent::WarningCleared);
        }

        // Elapsed time is always measured from the latest rising edge, so any
        // missed tick restarts the hold.
        let started = match self.hold_started_at {
            Some(started) => started,
            None => {
                self.hold_started_at = Some(now);
                self.matched = true;
                outcome.events.push(HoldEvent::MatchStarted);
                now
            }
        };

        let elapsed = now.saturating_sub(started);
        self.elapsed_hold_secs = elapsed
            .as_secs_f64()
            .min(self.config.hold_target.as_secs_f64());
        self.breath_phase = Some(self.breath_phase_at(elapsed));
        outcome.accuracy_sample = Some(accuracy);

        if elapsed >= self.config.hold_target {
            self.status = HoldStatus::Completed;
            self.matched = false;
            self.breath_phase = None;
            outcome.events.push(HoldEvent::Completed);
        }
    }

    fn breath_phase_at(&self, elapsed: Duration) -> BreathPhase {
        let phase_ms = self.config.breath_phase.as_millis().max(1);
        if (elapsed.as_millis() / phase_ms) % 2 == 0 {
            BreathPhase::Inhale
        } else {
            BreathPhase::Exhale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: u64 = 100;

    fn at(tick: u64) -> Duration {
        Duration::from_millis(tick * TICK)
    }

    fn sampling() -> HoldState {
        let mut state = HoldState::new(HoldConfig::default());
        state.begin(PoseClass::Tree);
        state
    }

    fn matched() -> Observation {
        Observation::Matched { accuracy: 80.0 }
    }

    #[test]
    fn test_idle_ignores_ticks() {
        let mut state = HoldState::new(HoldConfig::default());
        let outcome = state.tick(matched(), at(0));
        assert!(outcome.events.is_empty());
        assert_eq!(state.status, HoldStatus::Idle);
        assert!(!state.matched);
    }

    #[test]
    fn test_continuous_hold_completes_exactly_once() {
        let mut state = sampling();
        let mut completions = Vec::new();

        for i in 0..=350 {
            let outcome = state.tick(matched(), at(i));
            if outcome.has(HoldEvent::Completed) {
                completions.push(i);
            }
        }

        // Rising edge at tick 0, elapsed reaches 30s at tick 300.
        assert_eq!(completions, vec![300]);
        assert_eq!(state.status, HoldStatus::Completed);
        assert_eq!(state.elapsed_hold_secs, 30.0);
        assert!(!state.matched);
        assert_eq!(state.breath_phase, None);
    }

    #[test]
    fn test_first_match_emits_rising_edge_once() {
        let mut state = sampling();
        let first = state.tick(matched(), at(0));
        let second = state.tick(matched(), at(1));
        assert!(first.has(HoldEvent::MatchStarted));
        assert!(!second.has(HoldEvent::MatchStarted));
        assert_eq!(second.accuracy_sample, Some(80.0));
        assert!((state.elapsed_hold_secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_single_miss_restarts_the_hold() {
        let mut state = sampling();
        for i in 0..=290 {
            state.tick(matched(), at(i));
        }
        assert!((state.elapsed_hold_secs - 29.0).abs() < 1e-9);

        let miss = state.tick(Observation::NotMatched, at(291));
        assert!(miss.has(HoldEvent::MatchLost));
        assert!(!state.matched);

        let resumed = state.tick(matched(), at(292));
        assert!(resumed.has(HoldEvent::MatchStarted));
        assert_eq!(state.elapsed_hold_secs, 0.0);

        let mut completed_at = None;
        for i in 293..=600 {
            if state.tick(matched(), at(i)).has(HoldEvent::Completed) {
                completed_at = Some(i);
                break;
            }
        }
        assert_eq!(completed_at, Some(592));
    }

    #[test]
    fn test_warning_raised_at_three_seconds_and_cleared_on_match() {
        let mut state = sampling();
        for i in 0..29 {
            let outcome = state.tick(Observation::Undetected, at(i));
            assert!(!outcome.has(HoldEvent::WarningRaised), "tick {i}");
        }
        assert!(!state.not_matched_warning);

        let thirtieth = state.tick(Observation::NotMatched, at(29));
        assert!(thirtieth.has(HoldEvent::WarningRaised));
        assert!(state.not_matched_warning);
        assert_eq!(state.no_match_ms, 3000);

        let later = state.tick(Observation::NotMatched, at(30));
        assert!(later.events.is_empty());
        assert!(state.not_matched_warning);

        let recovered = state.tick(matched(), at(31));
        assert!(recovered.has(HoldEvent::WarningCleared));
        assert!(!state.not_matched_warning);
        assert_eq!(state.no_match_ms, 0);
    }

    #[test]
    fn test_completed_ignores_further_ticks() {
        let mut state = sampling();
        for i in 0..=300 {
            state.tick(matched(), at(i));
        }
        assert!(state.is_completed());

        for i in 301..400 {
            let outcome = state.tick(Observation::Undetected, at(i));
            assert!(outcome.events.is_empty());
        }
        assert_eq!(state.no_match_ms, 0);
        assert!(!state.not_matched_warning);
    }

    #[test]
    fn test_retarget_mid_hold_resets_everything() {
        let mut state = sampling();
        for i in 0..=150 {
            state.tick(matched(), at(i));
        }
        assert!(state.matched);

        state.begin(PoseClass::Warrior);
        assert_eq!(state.status, HoldStatus::Sampling);
        assert_eq!(state.target, Some(PoseClass::Warrior));
        assert!(!state.matched);
        assert_eq!(state.elapsed_hold_secs, 0.0);
        assert_eq!(state.no_match_ms, 0);
        assert_eq!(state.hold_started_at, None);
        assert_eq!(state.breath_phase, None);
    }

    #[test]
    fn test_reset_from_completed_returns_to_idle() {
        let mut state = sampling();
        for i in 0..=300 {
            state.tick(matched(), at(i));
        }
        state.reset();
        assert_eq!(state.status, HoldStatus::Idle);
        assert_eq!(state.target, Some(PoseClass::Tree));
        assert_eq!(state.elapsed_hold_secs, 0.0);
    }

    #[test]
    fn test_breath_phase_toggles_every_four_seconds() {
        let mut state = sampling();
        state.tick(matched(), at(0));
        assert_eq!(state.breath_phase, Some(BreathPhase::Inhale));
        for i in 1..=40 {
            state.tick(matched(), at(i));
        }
        assert_eq!(state.breath_phase, Some(BreathPhase::Exhale));
        for i in 41..=80 {
            state.tick(matched(), at(i));
        }
        assert_eq!(state.breath_phase, Some(BreathPhase::Inhale));

        state.tick(Observation::NotMatched, at(81));
        assert_eq!(state.breath_phase, None);
    }
}
