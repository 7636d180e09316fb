//! Unified error types for the desk controller.
//!
//! Every fallible operation funnels into [`Error`], keeping the controller's
//! request handling uniform.  Caller mistakes are [`ValidationError`]s and are
//! returned synchronously; link failures are [`LinkError`]s and are normally
//! absorbed by the movement supervisor as a faulted attempt.

use core::fmt;

use crate::app::ports::{ConfigError, PresetError};
use crate::protocol::DecodeError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request was rejected before touching the desk.
    Validation(ValidationError),
    /// A link operation failed outside of a supervised attempt.
    Link(LinkError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The preset store rejected an operation.
    Preset(PresetError),
    /// The link was not handed back by the previous movement task.
    LinkUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Preset(e) => write!(f, "preset: {e}"),
            Self::LinkUnavailable => write!(f, "desk link unavailable"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Height is not strictly inside the configured bounds.
    OutOfRange { height_mm: i32, min_mm: i32, max_mm: i32 },
    /// No preset with this name exists.
    PresetNotFound(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                height_mm,
                min_mm,
                max_mm,
            } => write!(
                f,
                "height {height_mm}mm outside ({min_mm}mm, {max_mm}mm)"
            ),
            Self::PresetNotFound(name) => write!(f, "preset '{name}' not found"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Discovery did not find the configured device.
    DeviceNotFound,
    /// Connection was not established within the connect timeout.
    ConnectTimeout,
    /// The transport refused or dropped the connection attempt.
    ConnectFailed,
    /// An operation needed a connection that is not open.
    NotConnected,
    /// A characteristic write failed.  Carries the command name.
    WriteFailed(&'static str),
    /// Enabling or disabling telemetry notifications failed.
    SubscribeFailed,
    /// A telemetry notification could not be decoded.
    Decode(DecodeError),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::ConnectTimeout => write!(f, "connect timed out"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::WriteFailed(what) => write!(f, "write of {what} failed"),
            Self::SubscribeFailed => write!(f, "telemetry subscription failed"),
            Self::Decode(e) => write!(f, "telemetry decode: {e}"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<DecodeError> for LinkError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PresetError> for Error {
    fn from(e: PresetError) -> Self {
        Self::Preset(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
