// Digital pin access for plugins
//
// Plugins never touch GPIO registers or HAL types directly; they get a
// PinDriver for the duration of one poll. Writes are fire-and-forget:
// a failing pin is logged and otherwise ignored, the handler has no way
// to recover from it mid-step anyway.

use core::fmt;

use embedded_hal::digital::{Error as _, OutputPin};
use log::{trace, warn};

/// Board GPIO number.
pub type PinId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Output,
    Input,
}

pub trait PinDriver {
    fn init(&mut self, pin: PinId);
    fn set_mode(&mut self, pin: PinId, mode: PinMode);
    fn write_digital(&mut self, pin: PinId, level: Level);
}

impl<D: PinDriver + ?Sized> PinDriver for &mut D {
    fn init(&mut self, pin: PinId) {
        (**self).init(pin);
    }

    fn set_mode(&mut self, pin: PinId, mode: PinMode) {
        (**self).set_mode(pin, mode);
    }

    fn write_digital(&mut self, pin: PinId, level: Level) {
        (**self).write_digital(pin, level);
    }
}

/// A fixed set of HAL output pins addressed by board GPIO number.
///
/// The HAL pins are already configured as outputs when handed over, so
/// `init` and `set_mode(Output)` only log. Asking for an input on an
/// output-only bank is reported and ignored.
pub struct OutputBank<P, const N: usize> {
    pins: [(PinId, P); N],
}

impl<P: OutputPin, const N: usize> OutputBank<P, N> {
    pub const fn new(pins: [(PinId, P); N]) -> Self {
        Self { pins }
    }

    fn find(&mut self, pin: PinId) -> Option<&mut P> {
        self.pins
            .iter_mut()
            .find(|(id, _)| *id == pin)
            .map(|(_, p)| p)
    }

    pub fn release(self) -> [(PinId, P); N] {
        self.pins
    }
}

impl<P: OutputPin, const N: usize> PinDriver for OutputBank<P, N> {
    fn init(&mut self, pin: PinId) {
        if self.find(pin).is_none() {
            warn!("pin {}: not wired to this bank", pin);
            return;
        }
        trace!("pin {}: init", pin);
    }

    fn set_mode(&mut self, pin: PinId, mode: PinMode) {
        match mode {
            PinMode::Output => trace!("pin {}: output", pin),
            PinMode::Input => warn!("pin {}: bank is output-only, mode ignored", pin),
        }
    }

    fn write_digital(&mut self, pin: PinId, level: Level) {
        let Some(out) = self.find(pin) else {
            warn!("pin {}: write {} to unknown pin", pin, level);
            return;
        };
        let result = match level {
            Level::High => out.set_high(),
            Level::Low => out.set_low(),
        };
        if let Err(e) = result {
            warn!("pin {}: write {} failed: {:?}", pin, level, e.kind());
        }
    }
}
