// Ramp: blink `count` times, then walk a second counter up to `count`
// and back down to zero, one wait per step. Replies the final counter.
//
// Two loop regions share the session, each with its own counter and
// its own resume labels:
//
//   i  : 0 .. count      HIGH -> AfterHigh -> LOW -> AfterLow
//   i1 : 0 .. count      Ascending (i1 += 1 after the wait)
//   i1 : count .. 0      Descending (i1 -= 1 before the wait)

use log::{info, trace};

use super::PinConfig;
use crate::drivers::pin::{Level, PinDriver};
use crate::kernel::machine::{self, PluginState, Program, Step, StepContext};
use crate::kernel::plugin::{Invocation, Plugin};
use crate::kernel::status::{HandlerResult, PluginError};
use crate::kernel::wait::TimeoutWaiter;

crate::resume_labels! {
    pub enum RampAt { Entry, AfterHigh, AfterLow, Ascending, Descending }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RampCounters {
    pub i: u8,
    pub i1: u8,
}

pub type RampState = PluginState<RampCounters>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    pub config: PinConfig,
}

impl Ramp {
    pub const fn new(config: PinConfig) -> Self {
        Self { config }
    }

    fn blink_head<D: PinDriver>(
        &self,
        state: &mut RampState,
        cx: &mut StepContext<'_, D>,
    ) -> Step<RampAt> {
        if state.counters.i < state.request.total_blinks {
            cx.pins.write_digital(self.config.pin_led, Level::High);
            return Step::suspend(RampAt::AfterHigh, state.request.delay());
        }
        state.counters.i1 = 0;
        self.ascend(state)
    }

    fn ascend(&self, state: &mut RampState) -> Step<RampAt> {
        if state.counters.i1 < state.request.total_blinks {
            trace!("ramp: up {}", state.counters.i1);
            return Step::suspend(RampAt::Ascending, state.request.delay());
        }
        self.descend(state)
    }

    fn descend(&self, state: &mut RampState) -> Step<RampAt> {
        if state.counters.i1 > 0 {
            state.counters.i1 -= 1;
            trace!("ramp: down {}", state.counters.i1);
            return Step::suspend(RampAt::Descending, state.request.delay());
        }
        Step::Finish(state.counters.i1)
    }
}

impl Program for Ramp {
    type Label = RampAt;
    type Counters = RampCounters;

    fn step<D: PinDriver>(
        &self,
        at: RampAt,
        state: &mut RampState,
        cx: &mut StepContext<'_, D>,
    ) -> Result<Step<RampAt>, PluginError> {
        let step = match at {
            RampAt::Entry => {
                state.request = cx.read_request()?;
                state.counters = RampCounters::default();
                self.blink_head(state, cx)
            }
            RampAt::AfterHigh => {
                cx.pins.write_digital(self.config.pin_led, Level::Low);
                Step::suspend(RampAt::AfterLow, state.request.delay())
            }
            RampAt::AfterLow => {
                state.counters.i += 1;
                self.blink_head(state, cx)
            }
            RampAt::Ascending => {
                state.counters.i1 += 1;
                self.ascend(state)
            }
            RampAt::Descending => self.descend(state),
        };
        Ok(step)
    }
}

impl Plugin for Ramp {
    type State = RampState;
    type Persistent = ();

    const NAME: &'static str = "ramp";

    fn handler_init(&self) -> Result<(), PluginError> {
        self.config.validate()
    }

    fn exec_init<D: PinDriver>(
        &self,
        state: &mut RampState,
        pins: &mut D,
    ) -> Result<(), PluginError> {
        state.reset();
        self.config.prepare(pins);
        info!("ramp: pin {} ready", self.config.pin_led);
        Ok(())
    }

    fn handler<D: PinDriver, W: TimeoutWaiter>(
        &self,
        _persistent: &mut (),
        state: &mut RampState,
        inv: &mut Invocation<'_, D, W>,
    ) -> HandlerResult {
        machine::resume(self, state, inv)
    }
}
