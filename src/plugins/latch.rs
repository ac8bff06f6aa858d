// Latch: drive the output HIGH and echo the requested count.
//
// Runs to completion in a single call, so it keeps no session state and
// needs no resume labels. The only thing that survives between sessions
// is a tally of commands served.

use log::{debug, info};

use super::PinConfig;
use crate::drivers::command::CommandReader;
use crate::drivers::pin::{Level, PinDriver};
use crate::kernel::plugin::{Invocation, Plugin};
use crate::kernel::status::{HandlerResult, PluginError, Status};
use crate::kernel::wait::TimeoutWaiter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchTally {
    pub served: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    pub config: PinConfig,
}

impl Latch {
    pub const fn new(config: PinConfig) -> Self {
        Self { config }
    }
}

impl Plugin for Latch {
    type State = ();
    type Persistent = LatchTally;

    const NAME: &'static str = "latch";

    fn handler_init(&self) -> Result<(), PluginError> {
        self.config.validate()
    }

    fn exec_init<D: PinDriver>(&self, _state: &mut (), pins: &mut D) -> Result<(), PluginError> {
        self.config.prepare(pins);
        info!("latch: pin {} ready", self.config.pin_led);
        Ok(())
    }

    fn handler<D: PinDriver, W: TimeoutWaiter>(
        &self,
        tally: &mut LatchTally,
        _state: &mut (),
        inv: &mut Invocation<'_, D, W>,
    ) -> HandlerResult {
        let req = CommandReader::new(inv.command).read_request()?;

        inv.pins.write_digital(self.config.pin_led, Level::High);
        inv.reply.write_byte(req.total_blinks)?;
        if inv.first_byte {
            tally.served = tally.served.wrapping_add(1);
        }
        debug!("latch: reply {}, {} served", req.total_blinks, tally.served);
        Ok(Status::Ok)
    }
}
