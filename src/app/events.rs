//! Outbound application events.
//!
//! The [`DeskController`](super::service::DeskController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::fsm::AttemptOutcome;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskEvent {
    /// A validated request was accepted and a movement task spawned.
    MovementRequested {
        target_mm: i32,
        preset: Option<String>,
    },

    /// The in-flight movement toward `target_mm` was cancelled by a newer request.
    Superseded { target_mm: i32 },

    /// One supervised attempt ended.  `attempt` counts from 1.
    AttemptFinished {
        target_mm: i32,
        attempt: u32,
        outcome: AttemptOutcome,
    },

    /// The movement task ended after `attempts` attempts.
    MovementFinished {
        target_mm: i32,
        success: bool,
        attempts: u32,
    },
}

/// Final result of a movement task, kept for callers that want to wait on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementReport {
    pub target_mm: i32,
    /// Outcome of the last attempt.
    pub outcome: AttemptOutcome,
    pub attempts: u32,
}

impl MovementReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
