//! Height unit conversion.
//!
//! The desk reports and accepts heights in *raw* units: tenths of a
//! millimetre above its lowest mechanical position, which sits at
//! [`BASE_HEIGHT_MM`] above the floor.  Everything the controller exposes
//! is in millimetres above the floor.

/// Floor-to-desktop height at raw position 0.
pub const BASE_HEIGHT_MM: i32 = 620;

/// Raw units per millimetre.
const RAW_PER_MM: i32 = 10;

/// Millimetres above the floor → raw units.
pub const fn to_raw(mm: i32) -> i32 {
    (mm - BASE_HEIGHT_MM) * RAW_PER_MM
}

/// Raw units → millimetres above the floor, rounding toward negative infinity.
pub const fn to_mm(raw: i32) -> i32 {
    raw.div_euclid(RAW_PER_MM) + BASE_HEIGHT_MM
}

/// Raw units → the `u16` carried on the wire.
///
/// Saturates: anything below the base encodes as 0 (the desk's lowest
/// position), anything past the top encodes as `u16::MAX`.
pub fn to_wire(raw: i32) -> u16 {
    raw.clamp(0, i32::from(u16::MAX)) as u16
}

/// Wire `u16` → millimetres above the floor.
pub fn wire_to_mm(raw: u16) -> i32 {
    to_mm(i32::from(raw))
}
