// Blink: `total_blinks` times HIGH, wait, LOW, wait; reply the count

use log::info;

use super::PinConfig;
use crate::drivers::pin::{Level, PinDriver};
use crate::kernel::machine::{self, PluginState, Program, Step, StepContext};
use crate::kernel::plugin::{Invocation, Plugin};
use crate::kernel::status::{HandlerResult, PluginError};
use crate::kernel::wait::TimeoutWaiter;

crate::resume_labels! {
    pub enum BlinkAt { Entry, AfterHigh, AfterLow }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlinkCounters {
    pub i: u8,
}

pub type BlinkState = PluginState<BlinkCounters>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blink {
    pub config: PinConfig,
}

impl Blink {
    pub const fn new(config: PinConfig) -> Self {
        Self { config }
    }

    // loop head: either light up and wait, or leave the loop
    fn next_blink<D: PinDriver>(
        &self,
        state: &mut BlinkState,
        cx: &mut StepContext<'_, D>,
    ) -> Step<BlinkAt> {
        if state.counters.i < state.request.total_blinks {
            cx.pins.write_digital(self.config.pin_led, Level::High);
            Step::suspend(BlinkAt::AfterHigh, state.request.delay())
        } else {
            Step::Finish(state.counters.i)
        }
    }
}

impl Program for Blink {
    type Label = BlinkAt;
    type Counters = BlinkCounters;

    fn step<D: PinDriver>(
        &self,
        at: BlinkAt,
        state: &mut BlinkState,
        cx: &mut StepContext<'_, D>,
    ) -> Result<Step<BlinkAt>, PluginError> {
        match at {
            BlinkAt::Entry => {
                state.request = cx.read_request()?;
                state.counters.i = 0;
            }
            BlinkAt::AfterHigh => {
                cx.pins.write_digital(self.config.pin_led, Level::Low);
                return Ok(Step::suspend(BlinkAt::AfterLow, state.request.delay()));
            }
            BlinkAt::AfterLow => {
                state.counters.i += 1;
            }
        }
        Ok(self.next_blink(state, cx))
    }
}

impl Plugin for Blink {
    type State = BlinkState;
    type Persistent = ();

    const NAME: &'static str = "blink";

    fn handler_init(&self) -> Result<(), PluginError> {
        self.config.validate()
    }

    fn exec_init<D: PinDriver>(
        &self,
        state: &mut BlinkState,
        pins: &mut D,
    ) -> Result<(), PluginError> {
        state.reset();
        self.config.prepare(pins);
        info!("blink: pin {} ready", self.config.pin_led);
        Ok(())
    }

    fn handler<D: PinDriver, W: TimeoutWaiter>(
        &self,
        _persistent: &mut (),
        state: &mut BlinkState,
        inv: &mut Invocation<'_, D, W>,
    ) -> HandlerResult {
        machine::resume(self, state, inv)
    }
}
