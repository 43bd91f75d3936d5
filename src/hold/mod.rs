pub mod state;

pub use state::{
    BreathPhase, HoldConfig, HoldEvent, HoldState, HoldStatus, Observation, TickOutcome,
};
