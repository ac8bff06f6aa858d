//! ESP32-C3 board map
//!
//! Which GPIOs plugins may drive and which ones belong to flash, USB and
//! the console. Plugin configuration is validated against this at
//! registration so the rest of the crate never needs to know the board.

pub mod pins;

pub use pins::{STATUS_LED, validate_output};
