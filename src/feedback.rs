use serde::Serialize;
use tokio::sync::broadcast;

use crate::hold::{BreathPhase, HoldState, HoldStatus};
use crate::models::SessionRecord;
use crate::pose::{Overlay, PoseClass};

const CHANNEL_CAPACITY: usize = 256;

/// Per-tick view of the session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackFrame {
    pub target: Option<PoseClass>,
    pub matched: bool,
    pub not_matched_warning: bool,
    pub completed: bool,
    pub breath_phase: Option<BreathPhase>,
    pub elapsed_hold_secs: f64,
    pub overlay: Option<Overlay>,
}

impl FeedbackFrame {
    pub fn from_state(state: &HoldState, overlay: Option<Overlay>) -> Self {
        Self {
            target: state.target,
            matched: state.matched,
            not_matched_warning: state.not_matched_warning,
            completed: state.status == HoldStatus::Completed,
            breath_phase: state.breath_phase,
            elapsed_hold_secs: state.elapsed_hold_secs,
            overlay,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedbackEvent {
    Tick(FeedbackFrame),
    MatchStarted,
    MatchLost,
    WarningRaised,
    WarningCleared,
    Completed { record: SessionRecord },
    Stopped,
    ModelError { message: String },
}

/// Fan-out of feedback events. Sending with no subscribers is not an error.
#[derive(Clone)]
pub struct FeedbackBus {
    tx: broadcast::Sender<FeedbackEvent>,
}

impl FeedbackBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: FeedbackEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for FeedbackBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hold::HoldConfig;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = FeedbackBus::new();
        bus.emit(FeedbackEvent::Stopped);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe();
        bus.emit(FeedbackEvent::MatchStarted);
        bus.emit(FeedbackEvent::MatchLost);
        assert!(matches!(rx.recv().await.unwrap(), FeedbackEvent::MatchStarted));
        assert!(matches!(rx.recv().await.unwrap(), FeedbackEvent::MatchLost));
    }

    #[test]
    fn test_tick_serializes_with_type_tag() {
        let mut state = HoldState::new(HoldConfig::default());
        state.begin(PoseClass::Tree);
        let event = FeedbackEvent::Tick(FeedbackFrame::from_state(&state, None));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["target"], "Tree");
        assert_eq!(json["notMatchedWarning"], false);
    }
}
