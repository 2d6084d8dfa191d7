//! # Calmkit Core Library
//!
//! Guided session engine behind Calmkit's emergency kit: timed breathing
//! exercises (inhale/hold/exhale cycles) and grounding exercises (timed
//! step sequences).
//!
//! ## Architecture
//!
//! - **Session Engine**: A tick-driven state machine that owns at most one
//!   session and emits an event for every transition
//! - **Clock**: Abstraction the engine schedules and cancels; a tokio
//!   driver turns it into real ticks
//! - **Catalog**: Built-in exercises plus user-defined ones from config
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`SessionDriver`]: Async driver for a shared engine
//! - [`Catalog`]: Exercise lookup
//! - [`Config`]: Application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;

pub use catalog::{Catalog, PANIC_EXERCISE_ID};
pub use error::{CatalogError, ConfigError, CoreError, SessionError};
pub use events::{ChannelListener, SessionEvent, SessionListener, StopReason};
pub use session::{
    BreathingDefinition, Clock, ClockHandle, EngineSettings, GroundingDefinition, ManualClock,
    Phase, PhaseSpec, SessionDriver, SessionEngine, SessionHandle, SessionKind, SessionState,
    SharedEngine,
};
pub use storage::Config;
