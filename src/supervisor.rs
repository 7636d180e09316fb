//! Movement supervisor: drives a [`Link`] through one attempt.
//!
//! ```text
//!  connect (timeout, cancel) ─▶ wake ─▶ stop ─▶ subscribe
//!                                                  │
//!          ┌──────────────────────────────────────┘
//!          ▼
//!   ┌─▶ cancelled? ─▶ move_to_raw ─▶ wait poll interval ─▶ observe ─┐
//!   └──────────────────────────── Commanding ◀──────────────────────┘
//!                                               │
//!                      Reached / Stalled / Cancelled / Faulted
//!                                               ▼
//!                unsubscribe ─▶ stop ─▶ disconnect ─▶ is_moving = false
//! ```
//!
//! Commands and observations are decoupled: the telemetry callback writes
//! [`SharedDeskState`] and the poll loop reads it back.  Until the first
//! sample of the session arrives the recorded height is stale and cannot
//! count as arrival.  Cleanup runs once
//! on every exit path of a started session and its failures are logged
//! without replacing the outcome.

use core::cell::Cell;
use core::time::Duration;
use std::sync::Arc;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, warn};

use crate::app::ports::Link;
use crate::config::MotionParams;
use crate::error::LinkError;
use crate::fsm::{AttemptOutcome, AttemptState, MovementAttempt};
use crate::state::SharedDeskState;
use crate::units;

// ── Cancellation ──────────────────────────────────────────────

/// Cooperative cancellation flag shared between the controller and one
/// movement task on the same executor.
pub struct CancelToken {
    flag: Cell<bool>,
    signal: Signal<NoopRawMutex, ()>,
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            flag: Cell::new(false),
            signal: Signal::new(),
        }
    }

    pub fn cancel(&self) {
        if !self.flag.replace(true) {
            self.signal.signal(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.signal.wait().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `period` unless cancelled first.  Returns `true` if cancelled.
pub async fn pause(cancel: &CancelToken, period: Duration) -> bool {
    future::or(
        async {
            cancel.cancelled().await;
            true
        },
        async {
            Timer::after(period).await;
            false
        },
    )
    .await
}

// ── Attempt driver ────────────────────────────────────────────

#[derive(Default)]
struct Session {
    connected: bool,
    subscribed: bool,
}

enum Connect {
    Done(Result<(), LinkError>),
    Cancelled,
    TimedOut,
}

/// Run one supervised attempt toward `target_mm`.
///
/// A token that is already cancelled ends the attempt before any link
/// traffic.  Otherwise the session is always released before returning and
/// `is_moving` is cleared.
pub async fn run_attempt<L: Link>(
    link: &mut L,
    target_mm: i32,
    state: &Arc<SharedDeskState>,
    cancel: &CancelToken,
    params: &MotionParams,
) -> AttemptOutcome {
    let mut attempt = MovementAttempt::new(target_mm, params.stall_ticks);
    if cancel.is_cancelled() {
        attempt.cancel();
        return AttemptOutcome::Cancelled;
    }

    let mut session = Session::default();
    let outcome = match drive(link, &mut attempt, &mut session, state, cancel, params).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("attempt[{}mm]: link failure: {}", target_mm, e);
            attempt.fault();
            AttemptOutcome::Faulted(e)
        }
    };

    release_session(link, &session).await;
    state.mark_stopped();
    outcome
}

async fn drive<L: Link>(
    link: &mut L,
    attempt: &mut MovementAttempt,
    session: &mut Session,
    state: &Arc<SharedDeskState>,
    cancel: &CancelToken,
    params: &MotionParams,
) -> Result<AttemptOutcome, LinkError> {
    let raw = units::to_wire(units::to_raw(attempt.target_mm()));

    match connect_within(link, cancel, params.connect_timeout).await {
        Connect::Done(res) => res?,
        Connect::Cancelled => {
            attempt.cancel();
            return Ok(AttemptOutcome::Cancelled);
        }
        Connect::TimedOut => return Err(LinkError::ConnectTimeout),
    }
    session.connected = true;
    attempt.connected();

    link.wake_up().await?;
    link.stop().await?;
    let samples_before = state.samples();
    let sink = Arc::clone(state);
    link.subscribe_telemetry(Box::new(move |sample| sink.record_telemetry(sample)))
        .await?;
    session.subscribed = true;
    attempt.ready();

    loop {
        if cancel.is_cancelled() {
            attempt.cancel();
            return Ok(AttemptOutcome::Cancelled);
        }

        link.move_to_raw(raw).await?;
        attempt.commanded();

        if pause(cancel, params.poll_interval).await {
            attempt.cancel();
            return Ok(AttemptOutcome::Cancelled);
        }

        let pos = state.position();
        let (current, moving) = (pos.height_mm, pos.is_moving);
        let verdict = if pos.samples > samples_before {
            attempt.observe(current, moving)
        } else {
            attempt.observe_unsampled()
        };
        match verdict {
            AttemptState::Reached => return Ok(AttemptOutcome::Reached),
            AttemptState::Stalled => {
                warn!(
                    "attempt[{}mm]: stalled at {}mm after {} polls",
                    attempt.target_mm(),
                    current,
                    attempt.elapsed_ticks()
                );
                return Ok(AttemptOutcome::Stalled);
            }
            _ => debug!(
                "attempt[{}mm]: at {}mm moving={} stationary={}",
                attempt.target_mm(),
                current,
                moving,
                attempt.stationary_ticks()
            ),
        }
    }
}

async fn connect_within<L: Link>(
    link: &mut L,
    cancel: &CancelToken,
    timeout: Duration,
) -> Connect {
    future::or(
        async {
            cancel.cancelled().await;
            Connect::Cancelled
        },
        future::or(async { Connect::Done(link.connect().await) }, async {
            Timer::after(timeout).await;
            Connect::TimedOut
        }),
    )
    .await
}

/// Unsubscribe (if subscribed), stop (if connected), disconnect (always).
async fn release_session<L: Link>(link: &mut L, session: &Session) {
    if session.subscribed {
        if let Err(e) = link.unsubscribe_telemetry().await {
            warn!("cleanup: unsubscribe failed: {}", e);
        }
    }
    if session.connected {
        if let Err(e) = link.stop().await {
            warn!("cleanup: stop failed: {}", e);
        }
    }
    if let Err(e) = link.disconnect().await {
        warn!("cleanup: disconnect failed: {}", e);
    }
}
