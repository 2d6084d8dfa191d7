mod clock;
mod definition;
mod driver;
mod engine;

pub use clock::{Clock, ClockHandle, ManualClock, Recurrence, WatchClock};
pub use definition::{BreathingDefinition, GroundingDefinition, Phase, PhaseSpec};
pub use driver::{SessionDriver, SharedEngine};
pub use engine::{
    BreathingSession, EngineSettings, GroundingSession, PhaseView, SessionEngine, SessionHandle,
    SessionKind, SessionState, StepView, DEFAULT_GROUNDING_STEP,
};
