//! GPIO |     Function     |      Notes
//! -----+------------------+----------------------------------
//!  0-7 | free             | usable as plugin outputs
//!  8   | Status LED       | on-board LED of C3 dev boards
//!  9   | BOOT strap       | input at reset, avoid driving it
//! 10   | free             |
//! 11-17| SPI flash        | reserved, never handed to plugins
//! 18-19| USB D-/D+        | reserved while USB-serial is in use
//! 20-21| UART0 RX/TX      | console

use core::ops::RangeInclusive;

use crate::drivers::pin::PinId;

pub const GPIO_COUNT: PinId = 22;

// ----- Plugin outputs -----
pub const STATUS_LED: PinId = 8;
pub const AUX_OUT_0: PinId = 4;
pub const AUX_OUT_1: PinId = 5;

// ----- Reserved -----
pub const BOOT_STRAP: PinId = 9;
pub const SPI_FLASH: RangeInclusive<PinId> = 11..=17;
pub const USB: RangeInclusive<PinId> = 18..=19;
pub const UART0: RangeInclusive<PinId> = 20..=21;

/// Check that `pin` exists and may be driven by a plugin.
pub fn validate_output(pin: PinId) -> Result<(), &'static str> {
    if pin >= GPIO_COUNT {
        return Err("pin out of range");
    }
    if pin == BOOT_STRAP {
        return Err("pin is a boot strap");
    }
    if SPI_FLASH.contains(&pin) {
        return Err("pin is wired to SPI flash");
    }
    if USB.contains(&pin) || UART0.contains(&pin) {
        return Err("pin is a console line");
    }
    Ok(())
}
