//! Desk controller: the hexagonal core.
//!
//! [`DeskController`] owns the shared [`DeskState`], the link (while no
//! movement is running) and at most one in-flight movement task.  It
//! exposes a plain call API; all I/O flows through port traits, so the
//! controller is testable with scripted mock links.
//!
//! ```text
//!   request ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!               │      DeskController        │
//! PresetLookup ─▶│ validate · supersede ·    │
//!               │ spawn movement task        │
//!               └─────────────┬─────────────┘
//!                             ▼ (link moved in, handed back at the end)
//!                  movement task: attempt ─▶ retry ─▶ report
//! ```
//!
//! Requests are serialized by an async lock around the link slot.  The
//! state record is never behind that lock, so [`DeskController::get_state`]
//! returns immediately even while a request is awaiting cleanup of the
//! previous movement.

use core::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use edge_executor::{LocalExecutor, Task};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use log::{error, info, warn};
use serde::Serialize;

use crate::config::{DeskConfig, MotionParams};
use crate::error::{Error, Result, ValidationError};
use crate::fsm::AttemptOutcome;
use crate::state::{DeskState, SharedDeskState};
use crate::supervisor::{self, CancelToken};

use super::commands::DeskCommand;
use super::events::{DeskEvent, MovementReport};
use super::ports::{EventSink, Link, PresetLookup};

/// Single-threaded executor the controller spawns movement tasks on.
pub type DeskExecutor = LocalExecutor<'static, 8>;

// ───────────────────────────────────────────────────────────────
// Movement task plumbing
// ───────────────────────────────────────────────────────────────

struct Running<L> {
    target_mm: i32,
    task: Task<(L, MovementReport)>,
    cancel: Rc<CancelToken>,
}

/// The link lives here between movements; while a task runs, the task
/// owns it and `running` holds the handle that gives it back.
struct Slot<L> {
    link: Option<L>,
    running: Option<Running<L>>,
}

impl<L> Slot<L> {
    /// Await the running task, if any, and take the link back.
    async fn join(&mut self) -> Option<MovementReport> {
        let run = self.running.as_mut()?;
        let (link, report) = (&mut run.task).await;
        self.running = None;
        self.link = Some(link);
        Some(report)
    }
}

/// Everything a movement task needs besides the link and its token.
#[derive(Clone)]
struct TaskCtx {
    state: Arc<SharedDeskState>,
    sink: Rc<dyn EventSink>,
    params: MotionParams,
    active: Rc<Cell<bool>>,
    last_report: Rc<RefCell<Option<MovementReport>>>,
}

/// Controller liveness, cheap to compute and never blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub movement_active: bool,
    /// `None` until the first movement finishes.
    pub last_movement_ok: Option<bool>,
}

// ───────────────────────────────────────────────────────────────
// DeskController
// ───────────────────────────────────────────────────────────────

pub struct DeskController<L: Link + 'static, P: PresetLookup> {
    executor: Rc<DeskExecutor>,
    presets: P,
    slot: Mutex<NoopRawMutex, Slot<L>>,
    ctx: TaskCtx,
}

impl<L: Link + 'static, P: PresetLookup> DeskController<L, P> {
    /// Build the controller and its shared state from `config`.
    ///
    /// `config` is expected to have passed validation already.
    pub fn new(
        executor: Rc<DeskExecutor>,
        link: L,
        presets: P,
        sink: Rc<dyn EventSink>,
        config: &DeskConfig,
    ) -> Self {
        let state = Arc::new(SharedDeskState::new(config.name.clone(), config.bounds()));
        info!(
            "controller: '{}' bounds ({}mm, {}mm)",
            config.name, config.min_height_mm, config.max_height_mm
        );
        Self {
            executor,
            presets,
            slot: Mutex::new(Slot {
                link: Some(link),
                running: None,
            }),
            ctx: TaskCtx {
                state,
                sink,
                params: config.motion(),
                active: Rc::new(Cell::new(false)),
                last_report: Rc::new(RefCell::new(None)),
            },
        }
    }

    // ── Requests ──────────────────────────────────────────────

    /// Validate `height_mm`, supersede any running movement and start a
    /// new one.  Returns once the task is spawned, not when motion ends.
    pub async fn set_target_height(&self, height_mm: i32) -> Result<()> {
        if let Err(e) = self.ctx.state.bounds().check(height_mm) {
            warn!("controller: rejected height request: {}", e);
            return Err(e.into());
        }
        self.start_movement(height_mm, None).await
    }

    /// Look up `name` and move to its height, recording it as the active preset.
    pub async fn apply_preset(&self, name: &str) -> Result<()> {
        let Some(preset) = self.presets.lookup(name) else {
            warn!("controller: unknown preset '{}'", name);
            return Err(ValidationError::PresetNotFound(name.to_owned()).into());
        };
        if let Err(e) = self.ctx.state.bounds().check(preset.height_mm) {
            warn!("controller: preset '{}' unusable: {}", name, e);
            return Err(e.into());
        }
        self.start_movement(preset.height_mm, Some(preset.name)).await
    }

    /// Dispatch an external command.
    pub async fn handle_command(&self, cmd: DeskCommand) -> Result<()> {
        match cmd {
            DeskCommand::SetHeight(mm) => self.set_target_height(mm).await,
            DeskCommand::ApplyPreset(name) => self.apply_preset(&name).await,
        }
    }

    async fn start_movement(&self, target_mm: i32, preset: Option<String>) -> Result<()> {
        let mut slot = self.slot.lock().await;

        if let Some(run) = slot.running.as_ref() {
            if !run.task.is_finished() {
                info!(
                    "controller: superseding movement to {}mm with {}mm",
                    run.target_mm, target_mm
                );
                run.cancel.cancel();
                self.ctx.sink.emit(&DeskEvent::Superseded {
                    target_mm: run.target_mm,
                });
            }
        }
        slot.join().await;

        let Some(link) = slot.link.take() else {
            error!("controller: link was not returned by the previous movement");
            return Err(Error::LinkUnavailable);
        };

        self.ctx.state.record_request(target_mm, preset.clone());
        self.ctx
            .sink
            .emit(&DeskEvent::MovementRequested { target_mm, preset });

        let cancel = Rc::new(CancelToken::new());
        let task = self.executor.spawn(movement_task(
            link,
            target_mm,
            Rc::clone(&cancel),
            self.ctx.clone(),
        ));
        slot.running = Some(Running {
            target_mm,
            task,
            cancel,
        });
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot of the desk.  Never waits on movement or on other requests.
    pub fn get_state(&self) -> DeskState {
        self.ctx.state.snapshot()
    }

    /// Wait for the in-flight movement, if any, and return its report.
    pub async fn wait_for_movement(&self) -> Option<MovementReport> {
        self.slot.lock().await.join().await
    }

    /// Report of the most recently finished movement.
    pub fn last_report(&self) -> Option<MovementReport> {
        self.ctx.last_report.borrow().clone()
    }

    pub fn health(&self) -> Health {
        Health {
            movement_active: self.ctx.active.get(),
            last_movement_ok: self
                .ctx
                .last_report
                .borrow()
                .as_ref()
                .map(MovementReport::is_success),
        }
    }

    /// Shared state handle for observers living outside the controller.
    pub fn state_handle(&self) -> Arc<SharedDeskState> {
        Arc::clone(&self.ctx.state)
    }
}

/// One movement: up to `retry_count + 1` attempts, then hand the link back.
async fn movement_task<L: Link>(
    mut link: L,
    target_mm: i32,
    cancel: Rc<CancelToken>,
    ctx: TaskCtx,
) -> (L, MovementReport) {
    ctx.active.set(true);
    let max_attempts = ctx.params.retry_count.saturating_add(1);
    let mut attempts = 0;

    let outcome = loop {
        attempts += 1;
        let outcome =
            supervisor::run_attempt(&mut link, target_mm, &ctx.state, &cancel, &ctx.params).await;
        ctx.sink.emit(&DeskEvent::AttemptFinished {
            target_mm,
            attempt: attempts,
            outcome: outcome.clone(),
        });

        if !outcome.is_retryable() || attempts >= max_attempts {
            break outcome;
        }
        warn!(
            "movement[{}mm]: attempt {}/{} {}, retrying",
            target_mm, attempts, max_attempts, outcome
        );
        if supervisor::pause(&cancel, ctx.params.retry_delay).await {
            break AttemptOutcome::Cancelled;
        }
    };

    match &outcome {
        AttemptOutcome::Reached => info!("movement[{}mm]: reached", target_mm),
        AttemptOutcome::Cancelled => info!("movement[{}mm]: superseded", target_mm),
        other => error!(
            "movement[{}mm]: failed after {} attempts: {}",
            target_mm, attempts, other
        ),
    }

    let report = MovementReport {
        target_mm,
        outcome,
        attempts,
    };
    ctx.sink.emit(&DeskEvent::MovementFinished {
        target_mm,
        success: report.is_success(),
        attempts,
    });
    *ctx.last_report.borrow_mut() = Some(report.clone());
    ctx.active.set(false);
    (link, report)
}
