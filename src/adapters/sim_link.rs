//! Simulated desk: a host-side [`Link`] backend.
//!
//! Models the desk as a small GATT register file.  Every link call is
//! encoded exactly as it would go over the air, written to the matching
//! characteristic and decoded again on the "device" side, so the simulation
//! exercises the real wire codec.  Height notifications go out through the
//! encoded telemetry payload.
//!
//! Each reference-input write moves the desk one step toward the target.
//! An optional obstruction height blocks travel past it in either
//! direction, which makes the supervisor observe a stall.

use log::{debug, info};

use crate::app::ports::{Link, TelemetryCallback};
use crate::error::LinkError;
use crate::protocol::{
    self, CMD_DOWN, CMD_STOP, CMD_UP, CMD_WAKEUP, Characteristic, REF_INPUT_DOWN, REF_INPUT_STOP,
    REF_INPUT_UP,
};
use crate::units;

/// Default travel per command (mm).
const DEFAULT_STEP_MM: i32 = 10;

/// Reported motor speed while travelling.
const TRAVEL_SPEED: i16 = 32;

pub struct SimulatedDesk {
    height_raw: i32,
    speed: i16,
    step_raw: i32,
    obstruction_raw: Option<i32>,
    connected: bool,
    awake: bool,
    listener: Option<TelemetryCallback>,
    sessions: u32,
}

impl SimulatedDesk {
    /// Desk resting at `start_mm`.
    pub fn new(start_mm: i32) -> Self {
        Self {
            height_raw: i32::from(units::to_wire(units::to_raw(start_mm))),
            speed: 0,
            step_raw: DEFAULT_STEP_MM * 10,
            obstruction_raw: None,
            connected: false,
            awake: false,
            listener: None,
            sessions: 0,
        }
    }

    /// Travel per command in millimetres (minimum 1).
    pub fn with_step_mm(mut self, step_mm: i32) -> Self {
        self.step_raw = step_mm.max(1) * 10;
        self
    }

    /// Something at `height_mm` that the desk cannot move past.
    pub fn with_obstruction(mut self, height_mm: i32) -> Self {
        self.obstruction_raw = Some(i32::from(units::to_wire(units::to_raw(height_mm))));
        self
    }

    pub fn height_mm(&self) -> i32 {
        units::to_mm(self.height_raw)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    // ── Device side ───────────────────────────────────────────

    fn write(&mut self, ch: Characteristic, payload: &[u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        let word = protocol::decode_word(payload)?;
        match ch {
            Characteristic::Command => self.on_command(word),
            Characteristic::ReferenceInput => self.on_reference(word),
            Characteristic::Height => return Err(LinkError::WriteFailed("height")),
        }
        self.notify();
        Ok(())
    }

    fn on_command(&mut self, word: u16) {
        match word {
            CMD_WAKEUP => self.awake = true,
            CMD_STOP => self.speed = 0,
            CMD_UP => self.step_toward(i32::from(u16::MAX)),
            CMD_DOWN => self.step_toward(0),
            other => debug!("sim: ignoring command {}", other),
        }
    }

    fn on_reference(&mut self, word: u16) {
        match word {
            REF_INPUT_STOP => self.speed = 0,
            REF_INPUT_UP => self.step_toward(i32::from(u16::MAX)),
            REF_INPUT_DOWN => self.step_toward(0),
            target => self.step_toward(i32::from(target)),
        }
    }

    fn step_toward(&mut self, target_raw: i32) {
        if !self.awake {
            debug!("sim: asleep, ignoring motion");
            self.speed = 0;
            return;
        }
        let from = self.height_raw;
        let delta = (target_raw - from).clamp(-self.step_raw, self.step_raw);
        let mut next = from + delta;

        if let Some(block) = self.obstruction_raw {
            let crosses_up = from <= block && next > block;
            let crosses_down = from >= block && next < block;
            if crosses_up || crosses_down {
                next = block;
            }
        }

        self.height_raw = next;
        self.speed = if next == from || next == target_raw {
            0
        } else if next > from {
            TRAVEL_SPEED
        } else {
            -TRAVEL_SPEED
        };
    }

    fn notify(&mut self) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };
        let raw = units::to_wire(self.height_raw);
        match protocol::decode_telemetry(&protocol::encode_telemetry(raw, self.speed)) {
            Ok(sample) => listener(sample),
            Err(e) => debug!("sim: telemetry encode failed: {}", e),
        }
    }
}

impl Link for SimulatedDesk {
    async fn connect(&mut self) -> Result<(), LinkError> {
        if !self.connected {
            self.connected = true;
            self.sessions += 1;
            info!("sim: connected (session {})", self.sessions);
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), LinkError> {
        if self.connected {
            info!("sim: disconnected at {}mm", self.height_mm());
        }
        self.connected = false;
        self.awake = false;
        self.listener = None;
        Ok(())
    }

    async fn wake_up(&mut self) -> Result<(), LinkError> {
        self.write(Characteristic::Command, &protocol::encode_command(CMD_WAKEUP))
    }

    async fn stop(&mut self) -> Result<(), LinkError> {
        self.write(Characteristic::Command, &protocol::encode_command(CMD_STOP))?;
        self.write(
            Characteristic::ReferenceInput,
            &protocol::encode_reference(REF_INPUT_STOP),
        )
    }

    async fn move_to_raw(&mut self, raw: u16) -> Result<(), LinkError> {
        self.write(
            Characteristic::ReferenceInput,
            &protocol::encode_reference(raw),
        )
    }

    async fn subscribe_telemetry(&mut self, on_update: TelemetryCallback) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::SubscribeFailed);
        }
        self.listener = Some(on_update);
        self.notify();
        Ok(())
    }

    async fn unsubscribe_telemetry(&mut self) -> Result<(), LinkError> {
        self.listener = None;
        Ok(())
    }
}
