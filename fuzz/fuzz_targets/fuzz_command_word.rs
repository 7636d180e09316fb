//! Fuzz target: command / reference-input words through the simulated desk.
//!
//! Interprets the input as a stream of little-endian reference-input words
//! and drives a simulated desk session with them.  The desk must never
//! panic and must stay inside its raw travel range.
//!
//! cargo fuzz run fuzz_command_word

#![no_main]

use deskctl::adapters::sim_link::SimulatedDesk;
use deskctl::app::ports::Link;
use deskctl::protocol::decode_word;
use deskctl::units;
use futures_lite::future::block_on;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut desk = SimulatedDesk::new(1000).with_step_mm(25);
    block_on(async {
        desk.connect().await.unwrap();
        desk.wake_up().await.unwrap();
        for chunk in data.chunks(2) {
            match decode_word(chunk) {
                Ok(word) => desk.move_to_raw(word).await.unwrap(),
                Err(_) => assert_eq!(chunk.len(), 1),
            }
        }
        desk.stop().await.unwrap();
        desk.disconnect().await.unwrap();
    });
    let h = desk.height_mm();
    assert!(h >= units::BASE_HEIGHT_MM);
    assert!(h <= units::wire_to_mm(u16::MAX));
});
