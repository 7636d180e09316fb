//! Inbound commands to the controller.
//!
//! These represent requests from the outside world (CLI, a future HTTP
//! front end) that the [`DeskController`](super::service::DeskController)
//! interprets via `handle_command`.

/// Commands that external adapters can send into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskCommand {
    /// Move to an absolute height in millimetres.
    SetHeight(i32),

    /// Move to the height stored under a preset name.
    ApplyPreset(String),
}
