//! Shared desk state.
//!
//! One [`SharedDeskState`] is created with the controller and lives for the
//! process lifetime.  It has two writers with disjoint fields:
//!
//! - the controller records requests (`target_height_mm`, `active_preset`);
//! - the movement task records telemetry (`current_height_mm`, `is_moving`).
//!
//! The record sits behind a critical-section mutex because telemetry
//! callbacks may arrive on a transport thread.  The lock is only ever held
//! for a copy or a field write, never across an `.await`.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, warn};
use serde::Serialize;

use crate::config::HeightBounds;
use crate::protocol::Telemetry;

/// Snapshot of the desk as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeskState {
    pub name: String,
    pub current_height_mm: i32,
    pub target_height_mm: i32,
    pub is_moving: bool,
    pub active_preset: Option<String>,
}

/// Height and motion as of the latest telemetry, plus how many samples
/// have been recorded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub height_mm: i32,
    pub is_moving: bool,
    pub samples: u64,
}

struct Record {
    desk: DeskState,
    samples: u64,
}

pub struct SharedDeskState {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Record>>,
    bounds: HeightBounds,
}

impl SharedDeskState {
    /// Mid-range height, not moving, no preset.
    pub fn new(name: impl Into<String>, bounds: HeightBounds) -> Self {
        let mid = bounds.midpoint();
        Self {
            inner: Mutex::new(RefCell::new(Record {
                desk: DeskState {
                    name: name.into(),
                    current_height_mm: mid,
                    target_height_mm: mid,
                    is_moving: false,
                    active_preset: None,
                },
                samples: 0,
            })),
            bounds,
        }
    }

    pub fn bounds(&self) -> HeightBounds {
        self.bounds
    }

    /// Copy of the current record.  Never waits on movement.
    pub fn snapshot(&self) -> DeskState {
        self.inner.lock(|s| s.borrow().desk.clone())
    }

    pub fn current_height_mm(&self) -> i32 {
        self.inner.lock(|s| s.borrow().desk.current_height_mm)
    }

    pub fn is_moving(&self) -> bool {
        self.inner.lock(|s| s.borrow().desk.is_moving)
    }

    /// Number of telemetry samples recorded since creation.
    pub fn samples(&self) -> u64 {
        self.inner.lock(|s| s.borrow().samples)
    }

    /// Current height, movement flag and sample count, read under one lock.
    pub fn position(&self) -> Position {
        self.inner.lock(|s| {
            let s = s.borrow();
            Position {
                height_mm: s.desk.current_height_mm,
                is_moving: s.desk.is_moving,
                samples: s.samples,
            }
        })
    }

    /// Controller side: a validated request was accepted.
    pub(crate) fn record_request(&self, target_mm: i32, preset: Option<String>) {
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            s.desk.target_height_mm = target_mm;
            s.desk.active_preset = preset;
        });
    }

    /// Movement-task side: a telemetry sample arrived.  This is the only
    /// writer link callbacks use.
    ///
    /// Heights outside the configured bounds are not recorded; the movement
    /// flag still follows the sample.
    pub fn record_telemetry(&self, sample: Telemetry) {
        let in_bounds = self.bounds.contains(sample.height_mm);
        if !in_bounds {
            warn!(
                "state: ignoring out-of-bounds height {}mm",
                sample.height_mm
            );
        }
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            s.samples = s.samples.wrapping_add(1);
            if in_bounds {
                s.desk.current_height_mm = sample.height_mm;
            }
            s.desk.is_moving = sample.is_moving();
        });
        debug!(
            "telemetry: {}mm speed={}",
            sample.height_mm, sample.speed
        );
    }

    /// Movement-task side: the session is closed.
    pub(crate) fn mark_stopped(&self) {
        self.inner.lock(|s| s.borrow_mut().desk.is_moving = false);
    }
}
