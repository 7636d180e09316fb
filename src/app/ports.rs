//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeskController (domain)
//! ```
//!
//! Driven adapters (the desk link, preset storage, event sinks, config
//! files) implement these traits.  The
//! [`DeskController`](super::service::DeskController) consumes them via
//! generics, so the domain core never touches a radio or a file directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::DeskConfig;
use crate::error::{LinkError, ValidationError};
use crate::presets::Preset;
use crate::protocol::Telemetry;

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain ↔ desk radio)
// ───────────────────────────────────────────────────────────────

/// Receives every decoded telemetry sample while subscribed.
///
/// `Send` because transports may deliver notifications on their own thread.
pub type TelemetryCallback = Box<dyn FnMut(Telemetry) + Send>;

/// One wireless session with the desk.
///
/// A `Link` value is owned by exactly one movement task at a time, so
/// implementations never see two overlapping sessions.
#[allow(async_fn_in_trait)]
pub trait Link {
    /// Discover the device and open a session.
    async fn connect(&mut self) -> Result<(), LinkError>;

    /// Close the session.  Idempotent: succeeds when already disconnected.
    async fn disconnect(&mut self) -> Result<(), LinkError>;

    /// Write the wake-up command.
    async fn wake_up(&mut self) -> Result<(), LinkError>;

    /// Halt the motor and clear the reference input.
    async fn stop(&mut self) -> Result<(), LinkError>;

    /// Write a raw target height to the reference input.
    async fn move_to_raw(&mut self, raw: u16) -> Result<(), LinkError>;

    /// Start delivering telemetry to `on_update`.
    async fn subscribe_telemetry(&mut self, on_update: TelemetryCallback)
    -> Result<(), LinkError>;

    /// Stop delivering telemetry and drop the callback.
    async fn unsubscribe_telemetry(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Preset lookup port (driven adapter: domain → preset storage)
// ───────────────────────────────────────────────────────────────

/// Name → height lookup consumed by `apply_preset`.
pub trait PresetLookup {
    fn lookup(&self, name: &str) -> Option<Preset>;
}

impl<T: PresetLookup + ?Sized> PresetLookup for Rc<T> {
    fn lookup(&self, name: &str) -> Option<Preset> {
        (**self).lookup(name)
    }
}

impl<T: PresetLookup + ?Sized> PresetLookup for Arc<T> {
    fn lookup(&self, name: &str) -> Option<Preset> {
        (**self).lookup(name)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DeskEvent`](super::events::DeskEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&self, event: &super::events::DeskEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists desk configuration.
///
/// Implementations MUST validate config values before returning or
/// persisting them.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`DeskConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DeskConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DeskConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config at the given location.
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from preset store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// A preset with this name already exists.
    Duplicate(String),
    /// No preset with this name exists.
    NotFound(String),
    /// Preset names must be non-empty printable text.
    InvalidName,
    /// The height is outside the configured bounds.
    Height(ValidationError),
    /// The preset file is not valid JSON.
    Corrupted,
    /// The preset file could not be read or written.
    IoError,
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate(name) => write!(f, "preset '{}' already exists", name),
            Self::NotFound(name) => write!(f, "preset '{}' not found", name),
            Self::InvalidName => write!(f, "invalid preset name"),
            Self::Height(e) => write!(f, "{}", e),
            Self::Corrupted => write!(f, "preset file corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for PresetError {}

impl From<ValidationError> for PresetError {
    fn from(e: ValidationError) -> Self {
        Self::Height(e)
    }
}
