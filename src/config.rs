//! Desk configuration parameters
//!
//! All tunable parameters for the desk controller.  Values come from a JSON
//! file (see [`crate::adapters::config_file`]) with `DESK_*` environment
//! overrides; every field is defaulted so partial files are accepted.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Core desk configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    // --- Identity ---
    /// Human-readable desk name, reported in the state snapshot
    pub name: String,
    /// Device address: `XX:XX:XX:XX:XX:XX` or a platform UUID
    pub mac_address: String,
    /// Local wireless adapter to use
    pub adapter_name: String,

    // --- Bounds ---
    /// Exclusive lower height bound (mm)
    pub min_height_mm: i32,
    /// Exclusive upper height bound (mm)
    pub max_height_mm: i32,

    // --- Movement supervision ---
    /// Interval between move commands while supervising (ms)
    pub poll_interval_ms: u32,
    /// Consecutive stationary polls away from target before giving up
    pub stall_ticks: u32,
    /// Upper bound on establishing a link session (ms)
    pub connect_timeout_ms: u32,
    /// Extra attempts after a stalled or faulted one
    pub retry_count: u32,
    /// Pause between attempts (ms)
    pub retry_delay_ms: u32,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            // Identity
            name: "my_desk".into(),
            mac_address: "0C6E3937-78B4-BA7E-A934-D4C5C9EDEC2A".into(),
            adapter_name: "hci0".into(),

            // Bounds
            min_height_mm: 600,
            max_height_mm: 1400,

            // Supervision
            poll_interval_ms: 100,    // 10 Hz
            stall_ticks: 20,          // 2 s at 10 Hz
            connect_timeout_ms: 10_000,
            retry_count: 1,
            retry_delay_ms: 1_000,
        }
    }
}

impl DeskConfig {
    pub fn bounds(&self) -> HeightBounds {
        HeightBounds::new(self.min_height_mm, self.max_height_mm)
    }

    pub fn motion(&self) -> MotionParams {
        MotionParams {
            poll_interval: Duration::from_millis(u64::from(self.poll_interval_ms)),
            stall_ticks: self.stall_ticks,
            connect_timeout: Duration::from_millis(u64::from(self.connect_timeout_ms)),
            retry_count: self.retry_count,
            retry_delay: Duration::from_millis(u64::from(self.retry_delay_ms)),
        }
    }
}

// ---------------------------------------------------------------------------
// Height bounds
// ---------------------------------------------------------------------------

/// Exclusive height range.  Every accepted target and every recorded height
/// lies strictly between `min_mm` and `max_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeightBounds {
    pub min_mm: i32,
    pub max_mm: i32,
}

impl HeightBounds {
    pub const fn new(min_mm: i32, max_mm: i32) -> Self {
        Self { min_mm, max_mm }
    }

    pub const fn contains(&self, mm: i32) -> bool {
        self.min_mm < mm && mm < self.max_mm
    }

    pub fn check(&self, mm: i32) -> Result<(), ValidationError> {
        if self.contains(mm) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                height_mm: mm,
                min_mm: self.min_mm,
                max_mm: self.max_mm,
            })
        }
    }

    /// Starting height before the first telemetry sample arrives.
    pub const fn midpoint(&self) -> i32 {
        self.min_mm + (self.max_mm - self.min_mm) / 2
    }
}

// ---------------------------------------------------------------------------
// Supervision timing
// ---------------------------------------------------------------------------

/// Timing and retry knobs consumed by the movement supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionParams {
    pub poll_interval: Duration,
    pub stall_ticks: u32,
    pub connect_timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for MotionParams {
    fn default() -> Self {
        DeskConfig::default().motion()
    }
}
