// Plugin contract: two lifecycle hooks and the polled handler
//
// A plugin value is its own configuration (which pins it drives). It is
// immutable for the lifetime of the registration; everything that
// changes lives in the session state or the persistent state handed in
// by the dispatcher.

use core::fmt::Debug;

use crate::drivers::pin::PinDriver;
use crate::drivers::reply::ReplyBuffer;
use crate::kernel::status::{HandlerResult, PluginError};
use crate::kernel::wait::{TimeoutWaiter, WaitContext};

/// Everything one handler call may touch besides its own state.
pub struct Invocation<'a, D, W> {
    pub pins: &'a mut D,
    pub waiter: &'a mut W,
    pub wait_cx: WaitContext,
    /// Raw command. Only read on a fresh entry.
    pub command: &'a [u8],
    pub reply: &'a mut ReplyBuffer,
    /// Set on the first call of a session.
    pub first_byte: bool,
}

pub trait Plugin {
    /// Per-session state, zeroed by `exec_init`.
    type State: Copy + Default + Debug;
    /// State that outlives sessions, owned by the dispatcher.
    type Persistent: Default + Debug;

    const NAME: &'static str;

    /// Called once at registration. Must not touch hardware.
    fn handler_init(&self) -> Result<(), PluginError>;

    /// Called before the first invocation of a slot and after every
    /// dispatcher reset.
    fn exec_init<D: PinDriver>(
        &self,
        state: &mut Self::State,
        pins: &mut D,
    ) -> Result<(), PluginError>;

    fn handler<D: PinDriver, W: TimeoutWaiter>(
        &self,
        persistent: &mut Self::Persistent,
        state: &mut Self::State,
        inv: &mut Invocation<'_, D, W>,
    ) -> HandlerResult;
}
