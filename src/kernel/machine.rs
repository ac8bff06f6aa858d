//! Resumable step machines.
//!
//! A handler that would read as a blocking sequence
//!
//! ```text
//! for i in 0..count { high(); sleep(d); low(); sleep(d); }
//! reply(i);
//! ```
//!
//! is recast as a [`Program`]: an enum of labels, one per point that
//! follows a wait, plus a `step` function that runs from a label to the
//! next wait (or to the end). Only the label is persisted between polls,
//! as a raw [`ResumePoint`], together with the parsed request and the
//! loop counters in [`PluginState`].
//!
//! [`resume`] drives one poll:
//!
//! 1. decode the persisted resume point; an unknown value resets the
//!    session and fails with `ProtocolViolation`,
//! 2. for any label but the entry, ask the waiter whether the wait left
//!    behind is still pending and if so return `Waiting` untouched,
//! 3. run `step`, then either register the requested wait and persist
//!    the label after it, or write the result byte and go back to fresh.
//!
//! Because step 2 returns before `step` is entered, side effects that
//! precede a wait are never repeated and the request and counters stay
//! exactly as they were at suspension.

use core::fmt::Debug;

use embassy_time::Duration;
use log::{debug, trace, warn};

use crate::drivers::command::{CommandReader, Request};
use crate::drivers::pin::PinDriver;
use crate::kernel::plugin::Invocation;
use crate::kernel::status::{HandlerResult, PluginError, Status};
use crate::kernel::wait::{TimeoutWaiter, Transfer, WaitFor};

/// Persisted label. `0` is a fresh entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumePoint(u8);

impl ResumePoint {
    pub const FRESH: Self = Self(0);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_fresh(self) -> bool {
        self.0 == 0
    }
}

pub trait Label: Copy + Debug + PartialEq {
    const ENTRY: Self;

    fn decode(point: ResumePoint) -> Option<Self>;
    fn encode(self) -> ResumePoint;
}

/// Declare the label set of a [`Program`]. The first variant is the
/// entry label and encodes as `0`, the rest follow in order.
///
/// ```
/// stepwise::resume_labels! {
///     pub enum At { Entry, AfterHigh, AfterLow }
/// }
/// use stepwise::kernel::machine::{Label, ResumePoint};
/// assert_eq!(At::decode(ResumePoint::from_raw(2)), Some(At::AfterLow));
/// assert_eq!(At::decode(ResumePoint::from_raw(3)), None);
/// ```
#[macro_export]
macro_rules! resume_labels {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $entry:ident $(, $label:ident)* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        $vis enum $name {
            $entry = 0,
            $($label,)*
        }

        impl $crate::kernel::machine::Label for $name {
            const ENTRY: Self = $name::$entry;

            fn decode(point: $crate::kernel::machine::ResumePoint) -> Option<Self> {
                const ALL: &[$name] = &[$name::$entry, $($name::$label,)*];
                ALL.get(usize::from(point.raw())).copied()
            }

            fn encode(self) -> $crate::kernel::machine::ResumePoint {
                $crate::kernel::machine::ResumePoint::from_raw(self as u8)
            }
        }
    };
}

/// Session state of a resumable plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginState<C> {
    pub resume_point: ResumePoint,
    pub request: Request,
    pub counters: C,
}

impl<C: Default> PluginState<C> {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_fresh(&self) -> bool {
        self.resume_point.is_fresh()
    }
}

/// What a step asks for once it stops running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<L> {
    /// Register `wait` and continue at `resume` once it is satisfied.
    Suspend { resume: L, wait: WaitFor },
    /// Done: reply with this byte.
    Finish(u8),
}

impl<L> Step<L> {
    /// Sleep for `delay`.
    pub fn suspend(resume: L, delay: Duration) -> Self {
        Step::Suspend {
            resume,
            wait: WaitFor::Timeout(delay),
        }
    }

    /// Block until the bus reports `transfer` as finished.
    pub fn suspend_on(resume: L, transfer: Transfer) -> Self {
        Step::Suspend {
            resume,
            wait: WaitFor::Transfer(transfer),
        }
    }
}

/// The part of an invocation a step may use. Waits are not reachable
/// from here; a step asks for one by returning [`Step::Suspend`].
pub struct StepContext<'a, D> {
    pub pins: &'a mut D,
    command: &'a [u8],
}

impl<'a, D: PinDriver> StepContext<'a, D> {
    pub fn new(pins: &'a mut D, command: &'a [u8]) -> Self {
        Self { pins, command }
    }

    pub fn command(&self) -> CommandReader<'a> {
        CommandReader::new(self.command)
    }

    pub fn read_request(&self) -> Result<Request, PluginError> {
        Ok(self.command().read_request()?)
    }
}

pub trait Program {
    type Label: Label;
    type Counters: Copy + Default + Debug;

    /// Run from `at` to the next suspension or to completion. `at` is
    /// either the entry label or a label whose wait has elapsed.
    fn step<D: PinDriver>(
        &self,
        at: Self::Label,
        state: &mut PluginState<Self::Counters>,
        cx: &mut StepContext<'_, D>,
    ) -> Result<Step<Self::Label>, PluginError>;
}

/// Poll a [`Program`] once.
pub fn resume<P, D, W>(
    program: &P,
    state: &mut PluginState<P::Counters>,
    inv: &mut Invocation<'_, D, W>,
) -> HandlerResult
where
    P: Program,
    D: PinDriver,
    W: TimeoutWaiter,
{
    let point = state.resume_point;
    let Some(at) = P::Label::decode(point) else {
        warn!(
            "session {}: resume point {} matches no label, resetting",
            inv.wait_cx.0,
            point.raw()
        );
        state.reset();
        inv.waiter.cancel(inv.wait_cx);
        return Err(PluginError::ProtocolViolation {
            resume_point: point.raw(),
        });
    };

    if at != P::Label::ENTRY && inv.waiter.is_still_waiting(inv.wait_cx) {
        trace!("session {}: still waiting at {:?}", inv.wait_cx.0, at);
        return Ok(Status::Waiting);
    }

    let mut cx = StepContext::new(&mut *inv.pins, inv.command);
    let step = match program.step(at, state, &mut cx) {
        Ok(step) => step,
        Err(e) => {
            state.reset();
            return Err(e);
        }
    };

    match step {
        Step::Suspend { resume, wait } => {
            if resume == P::Label::ENTRY {
                // resuming at the entry would parse the command again
                let raw = resume.encode().raw();
                state.reset();
                return Err(PluginError::ProtocolViolation { resume_point: raw });
            }
            inv.waiter.arm(inv.wait_cx, wait);
            state.resume_point = resume.encode();
            debug!("session {}: {:?} -> suspend on {}", inv.wait_cx.0, resume, wait);
            Ok(Status::Waiting)
        }
        Step::Finish(result) => {
            state.resume_point = ResumePoint::FRESH;
            if let Err(e) = inv.reply.write_byte(result) {
                state.reset();
                return Err(e.into());
            }
            debug!("session {}: finished, reply {}", inv.wait_cx.0, result);
            Ok(Status::Ok)
        }
    }
}
