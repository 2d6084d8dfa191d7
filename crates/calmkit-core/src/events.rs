use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{Phase, SessionKind};

/// Every session state transition produces exactly one Event, delivered
/// synchronously and in transition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    PhaseChanged {
        session_id: Uuid,
        phase: Phase,
        remaining_secs: u32,
        cycle: u32,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    StepChanged {
        session_id: Uuid,
        step_index: usize,
        step_label: String,
        total_steps: usize,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        kind: SessionKind,
        exercise_id: String,
        at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: Uuid,
        kind: SessionKind,
        exercise_id: String,
        reason: StopReason,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UserCancelled,
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::PhaseChanged { session_id, .. }
            | SessionEvent::StepChanged { session_id, .. }
            | SessionEvent::SessionCompleted { session_id, .. }
            | SessionEvent::SessionStopped { session_id, .. } => *session_id,
        }
    }

    /// True for `SessionCompleted` and `SessionStopped`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionCompleted { .. } | SessionEvent::SessionStopped { .. }
        )
    }
}

/// Receives engine events. Called after the transition has been committed,
/// so the engine is already in its new state when a listener runs.
pub trait SessionListener: Send {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionListener for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Forwards events to an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: tokio::sync::mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelListener {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl SessionListener for ChannelListener {
    fn on_event(&mut self, event: &SessionEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!("event receiver dropped; discarding {:?}", event);
        }
    }
}
