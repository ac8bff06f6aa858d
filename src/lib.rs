// Non-blocking hardware plugins for a cooperative, single-threaded
// dispatcher (ESP32-C3 class devices, no threads, no heap)

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod drivers;
pub mod kernel;
pub mod plugins;
