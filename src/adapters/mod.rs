//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                   |
//! |----------------|--------------|-------------------------------|
//! | `config_file`  | ConfigPort   | JSON file + `DESK_*` env vars |
//! | `log_sink`     | EventSink    | `log` facade                  |
//! | `sim_link`     | Link         | In-process simulated desk     |
//!
//! The preset store ([`crate::presets::PresetStore`]) implements
//! `PresetLookup` itself.

pub mod config_file;
pub mod log_sink;
pub mod sim_link;
pub(super) mod utils;
