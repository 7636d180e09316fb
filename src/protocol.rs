//! Desk GATT wire protocol.
//!
//! Three characteristics are involved:
//!
//! ```text
//! ┌──────────────────┬──────────┬──────────────────────────────┐
//! │ Characteristic   │ Access   │ Payload                      │
//! ├──────────────────┼──────────┼──────────────────────────────┤
//! │ Height           │ notify   │ LE u16 raw height, LE i16 speed │
//! │ Command          │ write    │ LE u16 command word          │
//! │ Reference input  │ write    │ LE u16 raw target / sentinel │
//! └──────────────────┴──────────┴──────────────────────────────┘
//! ```
//!
//! Raw heights are tenths of a millimetre above the base height; see
//! [`crate::units`].

use core::fmt;

use crate::units;

// ---------------------------------------------------------------------------
// Characteristics
// ---------------------------------------------------------------------------

pub const HEIGHT_UUID: u128 = 0x99fa_0021_338a_1024_8a49_009c_0215_f78a;
pub const COMMAND_UUID: u128 = 0x99fa_0002_338a_1024_8a49_009c_0215_f78a;
pub const REFERENCE_INPUT_UUID: u128 = 0x99fa_0031_338a_1024_8a49_009c_0215_f78a;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    Height,
    Command,
    ReferenceInput,
}

impl Characteristic {
    pub const fn uuid(self) -> u128 {
        match self {
            Self::Height => HEIGHT_UUID,
            Self::Command => COMMAND_UUID,
            Self::ReferenceInput => REFERENCE_INPUT_UUID,
        }
    }

    pub fn from_uuid(uuid: u128) -> Option<Self> {
        match uuid {
            HEIGHT_UUID => Some(Self::Height),
            COMMAND_UUID => Some(Self::Command),
            REFERENCE_INPUT_UUID => Some(Self::ReferenceInput),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Command words
// ---------------------------------------------------------------------------

pub const CMD_UP: u16 = 71;
pub const CMD_DOWN: u16 = 70;
pub const CMD_STOP: u16 = 255;
pub const CMD_WAKEUP: u16 = 254;

/// Reference-input sentinels.  Any other value is a raw target height.
pub const REF_INPUT_STOP: u16 = 32769;
pub const REF_INPUT_UP: u16 = 32768;
pub const REF_INPUT_DOWN: u16 = 32767;

pub const fn encode_command(word: u16) -> [u8; 2] {
    word.to_le_bytes()
}

pub const fn encode_reference(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode a 2-byte command or reference-input write.
pub fn decode_word(payload: &[u8]) -> Result<u16, DecodeError> {
    match payload {
        [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
        _ => Err(DecodeError::BadLength(payload.len())),
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Telemetry payload length in bytes.
pub const TELEMETRY_LEN: usize = 4;

/// One decoded height notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    /// Height above the floor in millimetres.
    pub height_mm: i32,
    /// Signed motor speed; zero means stationary.
    pub speed: i16,
}

impl Telemetry {
    pub const fn is_moving(&self) -> bool {
        self.speed != 0
    }
}

/// Decode a height notification.  The payload must be exactly 4 bytes.
pub fn decode_telemetry(payload: &[u8]) -> Result<Telemetry, DecodeError> {
    let &[h0, h1, s0, s1] = payload else {
        return Err(DecodeError::BadLength(payload.len()));
    };
    Ok(Telemetry {
        height_mm: units::wire_to_mm(u16::from_le_bytes([h0, h1])),
        speed: i16::from_le_bytes([s0, s1]),
    })
}

/// Encode a height notification from a raw wire height.
pub fn encode_telemetry(raw: u16, speed: i16) -> [u8; TELEMETRY_LEN] {
    let [h0, h1] = raw.to_le_bytes();
    let [s0, s1] = speed.to_le_bytes();
    [h0, h1, s0, s1]
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload had the wrong number of bytes.
    BadLength(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(n) => write!(f, "unexpected payload length {n}"),
        }
    }
}

impl std::error::Error for DecodeError {}
