//! Application core: desk request handling behind port traits.
//!
//! This module contains the controller façade for the desk: request
//! validation, supersession of in-flight movement, and the retry policy.
//! All interaction with the radio and with storage happens through
//! **port traits** defined in [`ports`], keeping this layer testable with
//! scripted mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
