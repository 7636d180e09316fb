//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured controller events to the
//! `log` facade.  A push or HTTP adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::DeskEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DeskEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &DeskEvent) {
        match event {
            DeskEvent::MovementRequested { target_mm, preset } => match preset {
                Some(name) => info!("MOVE | target={}mm preset={}", target_mm, name),
                None => info!("MOVE | target={}mm", target_mm),
            },
            DeskEvent::Superseded { target_mm } => {
                info!("MOVE | superseded target={}mm", target_mm);
            }
            DeskEvent::AttemptFinished {
                target_mm,
                attempt,
                outcome,
            } => {
                if outcome.is_success() {
                    info!("ATTEMPT | #{} target={}mm {}", attempt, target_mm, outcome);
                } else {
                    warn!("ATTEMPT | #{} target={}mm {}", attempt, target_mm, outcome);
                }
            }
            DeskEvent::MovementFinished {
                target_mm,
                success,
                attempts,
            } => {
                info!(
                    "DONE | target={}mm {} after {} attempt(s)",
                    target_mm,
                    if *success { "OK" } else { "FAILED" },
                    attempts
                );
            }
        }
    }
}
