//! Supervised movement controller for wireless standing desks.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                   │
//! │   SimulatedDesk (Link)   JsonConfigFile   LogEventSink       │
//! │   ──────────────── Port Trait Boundary ────────────────      │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │ DeskController ─▶ movement task ─▶ supervisor + fsm  │   │
//! │   │          SharedDeskState · PresetStore               │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │   units · protocol (pure)                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod fsm;
pub mod presets;
pub mod protocol;
pub mod state;
pub mod supervisor;
pub mod units;

mod error;

pub use error::{Error, LinkError, Result, ValidationError};
