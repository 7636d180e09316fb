//! Per-attempt movement state machine.
//!
//! ```text
//!  Connecting ──▶ Waking ──▶ Commanding ◀──▶ Polling
//!      │            │            │              │
//!      ▼            ▼            ▼              ▼
//!  ┌─────────────────────────────────────────────────┐
//!  │  Reached │ Stalled │ Cancelled │ Faulted        │
//!  └─────────────────────────────────────────────────┘
//! ```
//!
//! The machine is pure: it holds counters and the current state and decides
//! transitions from observations.  The async driver lives in
//! [`crate::supervisor`], which performs the link I/O and feeds the results
//! in.  Terminal states are sticky; later events are ignored.

use core::fmt;

use log::info;

use crate::error::LinkError;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    Connecting,
    Waking,
    Commanding,
    Polling,
    Reached,
    Stalled,
    Cancelled,
    Faulted,
}

impl AttemptState {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Reached | Self::Stalled | Self::Cancelled | Self::Faulted
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Waking => "Waking",
            Self::Commanding => "Commanding",
            Self::Polling => "Polling",
            Self::Reached => "Reached",
            Self::Stalled => "Stalled",
            Self::Cancelled => "Cancelled",
            Self::Faulted => "Faulted",
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Reached,
    Stalled,
    Cancelled,
    Faulted(LinkError),
}

impl AttemptOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Reached)
    }

    /// Stalls and faults are retried; success and supersession are not.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Stalled | Self::Faulted(_))
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reached => write!(f, "reached"),
            Self::Stalled => write!(f, "stalled"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Faulted(e) => write!(f, "faulted ({e})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// Bookkeeping for a single supervised attempt.
#[derive(Debug, Clone)]
pub struct MovementAttempt {
    target_mm: i32,
    stall_threshold: u32,
    stationary_ticks: u32,
    elapsed_ticks: u32,
    state: AttemptState,
}

impl MovementAttempt {
    /// `stall_threshold` of 0 is treated as 1.
    pub fn new(target_mm: i32, stall_threshold: u32) -> Self {
        Self {
            target_mm,
            stall_threshold: stall_threshold.max(1),
            stationary_ticks: 0,
            elapsed_ticks: 0,
            state: AttemptState::Connecting,
        }
    }

    pub fn target_mm(&self) -> i32 {
        self.target_mm
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn stationary_ticks(&self) -> u32 {
        self.stationary_ticks
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    fn transition(&mut self, next: AttemptState) -> AttemptState {
        if self.state.is_terminal() || self.state == next {
            return self.state;
        }
        info!(
            "attempt[{}mm]: {} -> {}",
            self.target_mm,
            self.state.name(),
            next.name()
        );
        self.state = next;
        next
    }

    /// Link session established.
    pub fn connected(&mut self) -> AttemptState {
        self.transition(AttemptState::Waking)
    }

    /// Woken, stopped and subscribed; ready to command.
    pub fn ready(&mut self) -> AttemptState {
        self.transition(AttemptState::Commanding)
    }

    /// A move command went out this tick.
    pub fn commanded(&mut self) -> AttemptState {
        self.transition(AttemptState::Polling)
    }

    /// Evaluate one poll against the latest observed height.
    pub fn observe(&mut self, current_mm: i32, is_moving: bool) -> AttemptState {
        self.evaluate(Some(current_mm), is_moving)
    }

    /// Evaluate a poll before any telemetry arrived in this session.  The
    /// height is unknown, so the tick can only count toward a stall.
    pub fn observe_unsampled(&mut self) -> AttemptState {
        self.evaluate(None, false)
    }

    fn evaluate(&mut self, current_mm: Option<i32>, is_moving: bool) -> AttemptState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);

        if current_mm == Some(self.target_mm) {
            return self.transition(AttemptState::Reached);
        }
        if is_moving {
            self.stationary_ticks = 0;
        } else {
            self.stationary_ticks += 1;
            if self.stationary_ticks >= self.stall_threshold {
                return self.transition(AttemptState::Stalled);
            }
        }
        self.transition(AttemptState::Commanding)
    }

    pub fn cancel(&mut self) -> AttemptState {
        self.transition(AttemptState::Cancelled)
    }

    pub fn fault(&mut self) -> AttemptState {
        self.transition(AttemptState::Faulted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
