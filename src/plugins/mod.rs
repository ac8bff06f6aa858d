// Plugin families shipped with the runtime
//
// blink: HIGH / wait / LOW / wait, `count` times
// ramp:  blink, then an ascending and a descending counter phase, each
//        step behind its own wait
// latch: drive HIGH and echo the count, never suspends

pub mod blink;
pub mod latch;
pub mod ramp;

pub use blink::Blink;
pub use latch::Latch;
pub use ramp::Ramp;

use crate::board::pins;
use crate::drivers::pin::{PinDriver, PinId, PinMode};
use crate::kernel::status::PluginError;

/// Shared configuration: the single output a plugin drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub pin_led: PinId,
}

impl PinConfig {
    pub const fn new(pin_led: PinId) -> Self {
        Self { pin_led }
    }

    pub fn validate(&self) -> Result<(), PluginError> {
        pins::validate_output(self.pin_led).map_err(PluginError::Configuration)
    }

    pub fn prepare<D: PinDriver>(&self, pins: &mut D) {
        pins.init(self.pin_led);
        pins.set_mode(self.pin_led, PinMode::Output);
    }
}
