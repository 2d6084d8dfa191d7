//! Guided session engine.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads - a [`Clock`] decides when `tick()` happens and the engine only
//! tells the clock when to start and stop.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start_breathing--> Phase[0], Cycle 1
//! Phase[i], Cycle c --tick, time left--> Phase[i], Cycle c (remaining-1)
//! Phase[i], Cycle c --tick, time=0, i+1<len--> Phase[i+1], Cycle c
//! Phase[last], Cycle c --tick, time=0, c<total--> Phase[0], Cycle c+1
//! Phase[last], Cycle total --tick, time=0--> Idle (Completed)
//! any --stop--> Idle (Stopped)
//! ```
//!
//! Grounding sessions follow the same shape with a single step index.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(clock, listener, EngineSettings::default());
//! engine.start_breathing(definition)?;
//! // Once per clock period:
//! engine.fire(handle);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clock::{Clock, ClockHandle};
use super::definition::{BreathingDefinition, GroundingDefinition, Phase, PhaseSpec};
use crate::error::SessionError;
use crate::events::{SessionEvent, SessionListener, StopReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Breathing,
    Grounding,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Breathing => "breathing",
            SessionKind::Grounding => "grounding",
        }
    }
}

/// Identifies one started session. Every successful start yields a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: Uuid,
    pub kind: SessionKind,
    pub exercise_id: String,
}

impl SessionHandle {
    fn new(kind: SessionKind, exercise_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            exercise_id: exercise_id.to_string(),
        }
    }
}

/// Clock cadences for the two session kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// One breathing tick counts down one displayed second.
    pub breathing_tick: Duration,
    /// How long each grounding step is shown.
    pub grounding_step: Duration,
}

pub const DEFAULT_GROUNDING_STEP: Duration = Duration::from_secs(3);

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            breathing_tick: Duration::from_secs(1),
            grounding_step: DEFAULT_GROUNDING_STEP,
        }
    }
}

/// A breathing exercise in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreathingSession {
    /// The exercise as it was started.
    pub definition: Arc<BreathingDefinition>,
    /// Phases with zero duration removed, computed once at start.
    plan: Arc<[PhaseSpec]>,
    /// Index into the filtered plan, not into `definition.phases`.
    pub active_phase_index: usize,
    /// Seconds left in the active phase.
    pub remaining_secs: u32,
    /// 1-based.
    pub current_cycle: u32,
}

/// A grounding exercise in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSession {
    pub definition: Arc<GroundingDefinition>,
    /// 0-based index of the step being shown.
    pub current_step_index: usize,
}

/// Snapshot of the engine's session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    RunningBreathing(BreathingSession),
    RunningGrounding(GroundingSession),
}

/// The active breathing phase, as a display layer needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseView {
    pub phase: Phase,
    /// Seconds left in this phase.
    pub remaining_secs: u32,
    /// Full length of this phase in seconds.
    pub duration_secs: u32,
    /// 1-based cycle number.
    pub cycle: u32,
    pub total_cycles: u32,
}

/// The grounding step currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    /// 0-based.
    pub index: usize,
    pub label: String,
    /// Number of steps in the exercise.
    pub total: usize,
}

/// Outcome of advancing a running session by one tick.
enum Progress {
    Unchanged,
    Changed,
    Finished,
}

impl BreathingSession {
    pub fn plan(&self) -> &[PhaseSpec] {
        &self.plan
    }

    pub fn phase_spec(&self) -> PhaseSpec {
        self.plan[self.active_phase_index]
    }

    pub fn total_cycles(&self) -> u32 {
        self.definition.cycles
    }

    pub fn view(&self) -> PhaseView {
        let spec = self.phase_spec();
        PhaseView {
            phase: spec.phase,
            remaining_secs: self.remaining_secs,
            duration_secs: spec.duration_secs,
            cycle: self.current_cycle,
            total_cycles: self.total_cycles(),
        }
    }

    /// Seconds already counted down across the whole session.
    pub fn elapsed_secs(&self) -> u64 {
        let cycle_secs = self.definition.cycle_secs();
        let completed_cycles = (self.current_cycle as u64 - 1) * cycle_secs;
        let completed_phases: u64 = self.plan[..self.active_phase_index]
            .iter()
            .map(|s| s.duration_secs as u64)
            .sum();
        let in_phase = (self.phase_spec().duration_secs - self.remaining_secs) as u64;
        completed_cycles + completed_phases + in_phase
    }

    fn advance(&mut self) -> Progress {
        if self.remaining_secs > 1 {
            self.remaining_secs -= 1;
            return Progress::Unchanged;
        }
        if self.active_phase_index + 1 < self.plan.len() {
            self.active_phase_index += 1;
        } else if self.current_cycle < self.definition.cycles {
            self.current_cycle += 1;
            self.active_phase_index = 0;
        } else {
            return Progress::Finished;
        }
        self.remaining_secs = self.plan[self.active_phase_index].duration_secs;
        Progress::Changed
    }

    fn phase_event(&self, session_id: Uuid) -> SessionEvent {
        SessionEvent::PhaseChanged {
            session_id,
            phase: self.phase_spec().phase,
            remaining_secs: self.remaining_secs,
            cycle: self.current_cycle,
            total_cycles: self.total_cycles(),
            at: Utc::now(),
        }
    }
}

impl GroundingSession {
    pub fn step_label(&self) -> &str {
        &self.definition.steps[self.current_step_index]
    }

    pub fn total_steps(&self) -> usize {
        self.definition.steps.len()
    }

    pub fn view(&self) -> StepView {
        StepView {
            index: self.current_step_index,
            label: self.step_label().to_string(),
            total: self.total_steps(),
        }
    }

    fn advance(&mut self) -> Progress {
        if self.current_step_index + 1 >= self.total_steps() {
            return Progress::Finished;
        }
        self.current_step_index += 1;
        Progress::Changed
    }

    fn step_event(&self, session_id: Uuid) -> SessionEvent {
        SessionEvent::StepChanged {
            session_id,
            step_index: self.current_step_index,
            step_label: self.step_label().to_string(),
            total_steps: self.total_steps(),
            at: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn kind(&self) -> Option<SessionKind> {
        match self {
            SessionState::Idle => None,
            SessionState::RunningBreathing(_) => Some(SessionKind::Breathing),
            SessionState::RunningGrounding(_) => Some(SessionKind::Grounding),
        }
    }

    /// 0.0 .. 100.0 progress across the entire session.
    pub fn progress_pct(&self) -> f64 {
        match self {
            SessionState::Idle => 0.0,
            SessionState::RunningBreathing(s) => {
                let total = s.definition.total_secs();
                if total == 0 {
                    return 0.0;
                }
                (s.elapsed_secs() as f64 / total as f64 * 100.0).min(100.0)
            }
            SessionState::RunningGrounding(s) => {
                s.current_step_index as f64 / s.total_steps() as f64 * 100.0
            }
        }
    }
}

/// The running session together with the clock recurrence driving it.
/// No clock handle exists while the engine is idle.
#[derive(Debug)]
struct ActiveSession {
    handle: SessionHandle,
    clock: ClockHandle,
    state: Running,
}

#[derive(Debug)]
enum Running {
    Breathing(BreathingSession),
    Grounding(GroundingSession),
}

impl Running {
    fn advance(&mut self) -> Progress {
        match self {
            Running::Breathing(s) => s.advance(),
            Running::Grounding(s) => s.advance(),
        }
    }

    fn current_event(&self, session_id: Uuid) -> SessionEvent {
        match self {
            Running::Breathing(s) => s.phase_event(session_id),
            Running::Grounding(s) => s.step_event(session_id),
        }
    }
}

/// Owns at most one guided session and advances it on clock ticks.
pub struct SessionEngine<C, L> {
    clock: C,
    listener: L,
    settings: EngineSettings,
    active: Option<ActiveSession>,
}

impl<C: Clock, L: SessionListener> SessionEngine<C, L> {
    pub fn new(clock: C, listener: L, settings: EngineSettings) -> Self {
        Self {
            clock,
            listener,
            settings,
            active: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_handle(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    pub fn current_state(&self) -> SessionState {
        match self.active.as_ref().map(|a| &a.state) {
            None => SessionState::Idle,
            Some(Running::Breathing(s)) => SessionState::RunningBreathing(s.clone()),
            Some(Running::Grounding(s)) => SessionState::RunningGrounding(s.clone()),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` unless a breathing session runs.
    pub fn current_phase(&self) -> Result<PhaseView, SessionError> {
        match self.active.as_ref().map(|a| &a.state) {
            Some(Running::Breathing(s)) => Ok(s.view()),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` unless a grounding session runs.
    pub fn current_step(&self) -> Result<StepView, SessionError> {
        match self.active.as_ref().map(|a| &a.state) {
            Some(Running::Grounding(s)) => Ok(s.view()),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a breathing session, replacing any active session silently.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` without touching the
    /// current session if the definition is malformed.
    pub fn start_breathing(
        &mut self,
        definition: BreathingDefinition,
    ) -> Result<SessionHandle, SessionError> {
        let plan = definition.filtered_phases().inspect_err(|e| {
            warn!("rejected breathing definition: {e}");
        })?;
        let Some(first) = plan.first().copied() else {
            return Err(SessionError::invalid(&definition.id, "no phase with a duration"));
        };

        self.supersede();
        let handle = SessionHandle::new(SessionKind::Breathing, &definition.id);
        let clock = self.clock.schedule(self.settings.breathing_tick);
        let session = BreathingSession {
            definition: Arc::new(definition),
            plan: plan.into(),
            active_phase_index: 0,
            remaining_secs: first.duration_secs,
            current_cycle: 1,
        };
        info!(
            "breathing session {} started: {} ({} phases x {} cycles)",
            handle.id,
            handle.exercise_id,
            session.plan.len(),
            session.total_cycles()
        );
        let event = session.phase_event(handle.id);
        self.active = Some(ActiveSession {
            handle: handle.clone(),
            clock,
            state: Running::Breathing(session),
        });
        self.emit(event);
        Ok(handle)
    }

    /// Start a grounding session, replacing any active session silently.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` if the step list is empty.
    pub fn start_grounding(
        &mut self,
        definition: GroundingDefinition,
    ) -> Result<SessionHandle, SessionError> {
        definition.validate().inspect_err(|e| {
            warn!("rejected grounding definition: {e}");
        })?;

        self.supersede();
        let handle = SessionHandle::new(SessionKind::Grounding, &definition.id);
        let clock = self.clock.schedule(self.settings.grounding_step);
        let session = GroundingSession {
            definition: Arc::new(definition),
            current_step_index: 0,
        };
        info!(
            "grounding session {} started: {} ({} steps)",
            handle.id,
            handle.exercise_id,
            session.total_steps()
        );
        let event = session.step_event(handle.id);
        self.active = Some(ActiveSession {
            handle: handle.clone(),
            clock,
            state: Running::Grounding(session),
        });
        self.emit(event);
        Ok(handle)
    }

    /// Cancel the active session. Does nothing when idle.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.clock.cancel(active.clock);
        info!(
            "{} session {} stopped by user",
            active.handle.kind.as_str(),
            active.handle.id
        );
        self.emit(SessionEvent::SessionStopped {
            session_id: active.handle.id,
            kind: active.handle.kind,
            exercise_id: active.handle.exercise_id,
            reason: StopReason::UserCancelled,
            at: Utc::now(),
        });
    }

    /// Advance the active session by one clock unit. No-op when idle.
    pub fn tick(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        match active.state.advance() {
            Progress::Unchanged => {
                self.active = Some(active);
            }
            Progress::Changed => {
                let event = active.state.current_event(active.handle.id);
                debug!("session {} transition: {:?}", active.handle.id, event);
                self.active = Some(active);
                self.emit(event);
            }
            Progress::Finished => {
                self.clock.cancel(active.clock);
                info!(
                    "{} session {} completed",
                    active.handle.kind.as_str(),
                    active.handle.id
                );
                self.emit(SessionEvent::SessionCompleted {
                    session_id: active.handle.id,
                    kind: active.handle.kind,
                    exercise_id: active.handle.exercise_id,
                    at: Utc::now(),
                });
            }
        }
    }

    /// Clock entry point: ticks only if `clock` drives the active session.
    pub fn fire(&mut self, clock: ClockHandle) {
        match &self.active {
            Some(active) if active.clock == clock => self.tick(),
            _ => debug!("ignoring firing from inactive clock {:?}", clock),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Drop the active session without emitting anything for it.
    fn supersede(&mut self) {
        if let Some(previous) = self.active.take() {
            self.clock.cancel(previous.clock);
            debug!("session {} superseded", previous.handle.id);
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.listener.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<SessionEvent>>>;

    fn engine() -> (SessionEngine<ManualClock, impl SessionListener>, ManualClock, Log) {
        let clock = ManualClock::new();
        let log: Log = Arc::default();
        let sink = log.clone();
        let engine = SessionEngine::new(
            clock.clone(),
            move |e: &SessionEvent| sink.lock().unwrap().push(e.clone()),
            EngineSettings::default(),
        );
        (engine, clock, log)
    }

    fn box_breathing() -> BreathingDefinition {
        BreathingDefinition::with_pattern("box", "Box", "#6366f1", (2, 2, 2), 2)
    }

    #[test]
    fn start_breathing_enters_first_phase() {
        let (mut engine, clock, log) = engine();
        engine.start_breathing(box_breathing()).unwrap();

        let view = engine.current_phase().unwrap();
        assert_eq!(view.phase, Phase::Inhale);
        assert_eq!(view.remaining_secs, 2);
        assert_eq!(view.cycle, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(
            clock.active().map(|r| r.period),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn tick_counts_down_then_changes_phase() {
        let (mut engine, _, log) = engine();
        engine.start_breathing(box_breathing()).unwrap();

        engine.tick();
        assert_eq!(engine.current_phase().unwrap().remaining_secs, 1);
        assert_eq!(log.lock().unwrap().len(), 1);

        engine.tick();
        let view = engine.current_phase().unwrap();
        assert_eq!(view.phase, Phase::Hold);
        assert_eq!(view.remaining_secs, 2);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn invalid_definition_leaves_running_session_alone() {
        let (mut engine, clock, log) = engine();
        let handle = engine.start_breathing(box_breathing()).unwrap();
        let scheduled = clock.active();

        let mut bad = box_breathing();
        bad.cycles = 0;
        assert!(engine.start_breathing(bad).is_err());
        assert!(engine
            .start_grounding(GroundingDefinition::new("g", "G", "-", "#000", Vec::<String>::new()))
            .is_err());

        assert_eq!(engine.active_handle(), Some(&handle));
        assert_eq!(clock.active(), scheduled);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn stop_cancels_clock_once() {
        let (mut engine, clock, log) = engine();
        engine.start_breathing(box_breathing()).unwrap();
        engine.stop();
        engine.stop();

        assert!(engine.current_state().is_idle());
        assert!(clock.active().is_none());
        assert_eq!(clock.cancelled().len(), 1);
        let events = log.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            SessionEvent::SessionStopped {
                reason: StopReason::UserCancelled,
                ..
            }
        ));
    }

    #[test]
    fn fire_ignores_stale_handle() {
        let (mut engine, clock, _) = engine();
        engine.start_breathing(box_breathing()).unwrap();
        let stale = clock.active().unwrap().handle;
        engine.start_breathing(box_breathing()).unwrap();

        engine.fire(stale);
        assert_eq!(engine.current_phase().unwrap().remaining_secs, 2);

        let live = clock.active().unwrap().handle;
        engine.fire(live);
        assert_eq!(engine.current_phase().unwrap().remaining_secs, 1);
    }

    #[test]
    fn queries_fail_when_idle_or_wrong_kind() {
        let (mut engine, _, _) = engine();
        assert_eq!(engine.current_phase(), Err(SessionError::NoActiveSession));
        assert_eq!(engine.current_step(), Err(SessionError::NoActiveSession));

        engine
            .start_grounding(GroundingDefinition::new("g", "G", "-", "#000", ["a", "b"]))
            .unwrap();
        assert_eq!(engine.current_phase(), Err(SessionError::NoActiveSession));
        assert_eq!(engine.current_step().unwrap().label, "a");
    }

    #[test]
    fn progress_tracks_elapsed_seconds() {
        let (mut engine, _, _) = engine();
        engine.start_breathing(box_breathing()).unwrap();
        assert_eq!(engine.current_state().progress_pct(), 0.0);

        // 12 seconds total; 3 ticks in.
        for _ in 0..3 {
            engine.tick();
        }
        assert!((engine.current_state().progress_pct() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grounding_progress_counts_completed_steps() {
        let (mut engine, _, _) = engine();
        engine
            .start_grounding(GroundingDefinition::new(
                "g",
                "G",
                "-",
                "#000",
                ["a", "b", "c", "d", "e"],
            ))
            .unwrap();
        assert_eq!(engine.current_state().progress_pct(), 0.0);

        engine.tick();
        engine.tick();
        assert_eq!(engine.current_step().unwrap().index, 2);
        assert!((engine.current_state().progress_pct() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grounding_uses_step_cadence() {
        let (mut engine, clock, _) = engine();
        engine
            .start_grounding(GroundingDefinition::new("g", "G", "-", "#000", ["a"]))
            .unwrap();
        assert_eq!(clock.active().map(|r| r.period), Some(DEFAULT_GROUNDING_STEP));

        engine.tick();
        assert!(engine.current_state().is_idle());
        assert!(clock.active().is_none());
    }
}
