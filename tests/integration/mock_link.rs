//! Scripted mock link for integration tests.
//!
//! Records every link call so tests can assert on the full command history,
//! and plays back a per-session script describing how the "desk" behaves.
//! Telemetry is delivered synchronously from inside `subscribe_telemetry`
//! and `move_to_raw`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use deskctl::LinkError;
use deskctl::app::events::DeskEvent;
use deskctl::app::ports::{EventSink, Link, TelemetryCallback};
use deskctl::app::service::DeskExecutor;
use deskctl::protocol::Telemetry;
use deskctl::units;

// ── Link call record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCall {
    Connect,
    Disconnect,
    WakeUp,
    Stop,
    MoveTo(u16),
    Subscribe,
    Unsubscribe,
}

/// How the desk behaves for one session.  The last script repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Moves `step_mm` toward the target per command, reporting a nonzero
    /// speed on every sample that follows a move.
    Travel { step_mm: i32 },
    /// Never moves and reports speed 0.
    Stuck,
    /// `connect` fails immediately.
    FailConnect,
    /// `connect` never completes.
    HangConnect,
    /// `subscribe_telemetry` fails.
    FailSubscribe,
    /// Accepts every call but never sends telemetry.
    Silent,
}

// ── Shared mock state ─────────────────────────────────────────

struct Inner {
    height_mm: i32,
    scripts: VecDeque<Script>,
    active: Script,
    connected: bool,
    sessions: u32,
    overlapping_sessions: u32,
    moves_this_session: u32,
    fail_cleanup: bool,
    calls: Vec<LinkCall>,
    listener: Option<TelemetryCallback>,
}

impl Inner {
    fn emit(&mut self, speed: i16) {
        let sample = Telemetry {
            height_mm: self.height_mm,
            speed,
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(sample);
        }
    }
}

/// Test-side view of a [`MockLink`]; survives the link being moved into
/// the controller.
#[derive(Clone)]
pub struct MockHandle(Rc<RefCell<Inner>>);

#[allow(dead_code)]
impl MockHandle {
    pub fn calls(&self) -> Vec<LinkCall> {
        self.0.borrow().calls.clone()
    }

    pub fn height_mm(&self) -> i32 {
        self.0.borrow().height_mm
    }

    pub fn sessions(&self) -> u32 {
        self.0.borrow().sessions
    }

    pub fn overlapping_sessions(&self) -> u32 {
        self.0.borrow().overlapping_sessions
    }

    pub fn moves_this_session(&self) -> u32 {
        self.0.borrow().moves_this_session
    }

    pub fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    pub fn set_fail_cleanup(&self, fail: bool) {
        self.0.borrow_mut().fail_cleanup = fail;
    }

    pub fn count(&self, call: LinkCall) -> usize {
        self.0.borrow().calls.iter().filter(|c| **c == call).count()
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink(Rc<RefCell<Inner>>);

impl MockLink {
    /// Desk resting at `height_mm`, following `scripts` session by session.
    pub fn new(height_mm: i32, scripts: &[Script]) -> (Self, MockHandle) {
        let mut scripts: VecDeque<Script> = scripts.iter().copied().collect();
        let active = scripts.front().copied().unwrap_or(Script::Stuck);
        if scripts.len() > 1 {
            scripts.pop_front();
        }
        let inner = Rc::new(RefCell::new(Inner {
            height_mm,
            scripts,
            active,
            connected: false,
            sessions: 0,
            overlapping_sessions: 0,
            moves_this_session: 0,
            fail_cleanup: false,
            calls: Vec::new(),
            listener: None,
        }));
        (Self(Rc::clone(&inner)), MockHandle(inner))
    }

    fn record(&self, call: LinkCall) {
        self.0.borrow_mut().calls.push(call);
    }
}

impl Link for MockLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        let script = {
            let mut m = self.0.borrow_mut();
            m.calls.push(LinkCall::Connect);
            if m.sessions > 0 {
                // Advance to the next session's script; the last one repeats.
                if let Some(next) = m.scripts.front().copied() {
                    m.active = next;
                    if m.scripts.len() > 1 {
                        m.scripts.pop_front();
                    }
                }
            }
            m.sessions += 1;
            m.moves_this_session = 0;
            if m.connected {
                m.overlapping_sessions += 1;
            }
            m.active
        };

        match script {
            Script::FailConnect => Err(LinkError::ConnectFailed),
            Script::HangConnect => {
                futures_lite::future::pending::<()>().await;
                Ok(())
            }
            _ => {
                self.0.borrow_mut().connected = true;
                Ok(())
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), LinkError> {
        let mut m = self.0.borrow_mut();
        m.calls.push(LinkCall::Disconnect);
        m.connected = false;
        m.listener = None;
        if m.fail_cleanup {
            return Err(LinkError::NotConnected);
        }
        Ok(())
    }

    async fn wake_up(&mut self) -> Result<(), LinkError> {
        self.record(LinkCall::WakeUp);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LinkError> {
        self.record(LinkCall::Stop);
        Ok(())
    }

    async fn move_to_raw(&mut self, raw: u16) -> Result<(), LinkError> {
        let mut m = self.0.borrow_mut();
        m.calls.push(LinkCall::MoveTo(raw));
        m.moves_this_session += 1;
        let target = units::wire_to_mm(raw);
        match m.active {
            Script::Travel { step_mm } => {
                let before = m.height_mm;
                let delta = (target - before).clamp(-step_mm, step_mm);
                m.height_mm = before + delta;
                let speed = if delta > 0 {
                    5
                } else if delta < 0 {
                    -5
                } else {
                    0
                };
                m.emit(speed);
            }
            Script::Silent => {}
            _ => m.emit(0),
        }
        Ok(())
    }

    async fn subscribe_telemetry(&mut self, on_update: TelemetryCallback) -> Result<(), LinkError> {
        let mut m = self.0.borrow_mut();
        m.calls.push(LinkCall::Subscribe);
        if m.active == Script::FailSubscribe {
            return Err(LinkError::SubscribeFailed);
        }
        m.listener = Some(on_update);
        if m.active != Script::Silent {
            m.emit(0);
        }
        Ok(())
    }

    async fn unsubscribe_telemetry(&mut self) -> Result<(), LinkError> {
        let mut m = self.0.borrow_mut();
        m.calls.push(LinkCall::Unsubscribe);
        m.listener = None;
        if m.fail_cleanup {
            return Err(LinkError::SubscribeFailed);
        }
        Ok(())
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<DeskEvent>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &DeskEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ── Executor helpers ──────────────────────────────────────────

/// Run `fut` to completion on `executor`, driving any tasks it spawns.
pub fn run_local<F>(executor: &Rc<DeskExecutor>, fut: F) -> F::Output
where
    F: Future + 'static,
    F::Output: 'static,
{
    futures_lite::future::block_on(executor.run(fut))
}

/// Yield to the executor until `cond` holds.
#[allow(dead_code)]
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        async_io_mini::Timer::after(Duration::from_millis(1)).await;
    }
}
