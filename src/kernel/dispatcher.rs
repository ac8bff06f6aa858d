// Session dispatcher for one registered plugin
//
// Owns the plugin value (its configuration), a fixed arena of N session
// slots and the waiter handlers register their waits with. Incoming
// commands go through a FIFO and are admitted into a slot only while the
// slot is idle, so a session never sees a second command before it has
// produced a terminal result. `tick` polls every busy slot once; a slot
// whose wait is still pending costs one clock compare.
//
// Nothing here blocks and nothing allocates. The pin driver is borrowed
// per call so several dispatchers can share one bank of pins.

use core::fmt;

use log::{debug, info, trace, warn};

use crate::drivers::command::CommandBuf;
use crate::drivers::pin::PinDriver;
use crate::drivers::reply::ReplyBuffer;
use crate::kernel::plugin::{Invocation, Plugin};
use crate::kernel::queue::RingQueue;
use crate::kernel::status::{PluginError, Status};
use crate::kernel::wait::{Clock, TimeoutWaiter, Transfer, WaitContext, WaitTable};

/// Commands that may wait for admission across all slots.
pub const PENDING_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u8);

impl SessionId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    const fn wait_context(self) -> WaitContext {
        WaitContext(self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    NoSuchSession(SessionId),
    CommandTooLong { len: usize },
    QueueFull,
    /// Polled a session with nothing in flight and nothing queued.
    Idle(SessionId),
    Plugin(PluginError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoSuchSession(id) => write!(f, "no session {}", id),
            DispatchError::CommandTooLong { len } => write!(f, "command too long ({} bytes)", len),
            DispatchError::QueueFull => write!(f, "command queue full"),
            DispatchError::Idle(id) => write!(f, "session {} is idle", id),
            DispatchError::Plugin(e) => write!(f, "{}", e),
        }
    }
}

impl core::error::Error for DispatchError {}

impl From<PluginError> for DispatchError {
    fn from(e: PluginError) -> Self {
        DispatchError::Plugin(e)
    }
}

/// Terminal result of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub session: SessionId,
    pub outcome: Result<ReplyBuffer, PluginError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub polled: usize,
    pub waiting: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    session: SessionId,
    command: CommandBuf,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot<S> {
    state: S,
    command: CommandBuf,
    reply: ReplyBuffer,
    busy: bool,
    first_byte: bool,
}

pub struct Dispatcher<P: Plugin, W, const N: usize> {
    plugin: P,
    persistent: P::Persistent,
    slots: [Slot<P::State>; N],
    waiter: W,
    pending: RingQueue<Pending, PENDING_CAP>,
}

impl<P: Plugin, W: TimeoutWaiter, const N: usize> Dispatcher<P, W, N> {
    /// Run `handler_init` once, then `exec_init` for every slot. A bad
    /// configuration fails here, before any command is accepted.
    pub fn register<D: PinDriver>(plugin: P, waiter: W, pins: &mut D) -> Result<Self, PluginError> {
        if N == 0 || N > usize::from(u8::MAX) + 1 {
            return Err(PluginError::Configuration("session count must be 1..=256"));
        }
        if waiter.capacity() < N {
            warn!(
                "{}: waiter holds {} contexts, {} sessions requested",
                P::NAME,
                waiter.capacity(),
                N
            );
            return Err(PluginError::Configuration("waiter smaller than session count"));
        }
        if let Err(e) = plugin.handler_init() {
            warn!("{}: rejected at registration: {}", P::NAME, e);
            return Err(e);
        }

        let mut dispatcher = Self {
            plugin,
            persistent: P::Persistent::default(),
            slots: core::array::from_fn(|_| Slot::default()),
            waiter,
            pending: RingQueue::new(),
        };
        dispatcher.init_slots(pins)?;
        info!("{}: registered with {} sessions", P::NAME, N);
        Ok(dispatcher)
    }

    fn init_slots<D: PinDriver>(&mut self, pins: &mut D) -> Result<(), PluginError> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot = Slot::default();
            self.plugin.exec_init(&mut slot.state, pins)?;
            self.waiter.cancel(WaitContext(i as u8));
        }
        Ok(())
    }

    /// Drop everything in flight and queued, then `exec_init` again.
    /// Outputs stay at whatever level the abandoned sessions left them.
    pub fn reset<D: PinDriver>(&mut self, pins: &mut D) -> Result<(), PluginError> {
        let busy = self.slots.iter().filter(|s| s.busy).count();
        if busy > 0 {
            warn!("{}: reset with {} sessions in flight", P::NAME, busy);
        }
        self.pending.clear();
        self.init_slots(pins)
    }

    fn check(&self, id: SessionId) -> Result<(), DispatchError> {
        if id.index() < N {
            Ok(())
        } else {
            Err(DispatchError::NoSuchSession(id))
        }
    }

    /// Queue a raw command for `id`. It is admitted once the session is
    /// idle, in submission order.
    pub fn submit(&mut self, id: SessionId, command: &[u8]) -> Result<(), DispatchError> {
        self.check(id)?;
        let command = CommandBuf::from_slice(command)
            .ok_or(DispatchError::CommandTooLong { len: command.len() })?;
        self.pending
            .push(Pending { session: id, command })
            .map_err(|_| DispatchError::QueueFull)?;
        debug!("{}: queued command for {}", P::NAME, id);
        Ok(())
    }

    fn admit(&mut self, index: usize) -> bool {
        let slot = &mut self.slots[index];
        if slot.busy {
            return true;
        }
        let Some(next) = self.pending.take_first(|p| p.session.index() == index) else {
            return false;
        };
        slot.command = next.command;
        slot.reply.clear();
        slot.busy = true;
        slot.first_byte = true;
        debug!("{}: session {} admitted", P::NAME, next.session);
        true
    }

    // None while the session is still suspended
    fn run<D: PinDriver>(
        &mut self,
        index: usize,
        pins: &mut D,
    ) -> Option<Result<ReplyBuffer, PluginError>> {
        let Self {
            plugin,
            persistent,
            slots,
            waiter,
            ..
        } = self;
        let slot = &mut slots[index];
        let wait_cx = WaitContext(index as u8);

        let mut inv = Invocation {
            pins,
            waiter: &mut *waiter,
            wait_cx,
            command: slot.command.as_bytes(),
            reply: &mut slot.reply,
            first_byte: slot.first_byte,
        };
        let result = plugin.handler(persistent, &mut slot.state, &mut inv);
        slot.first_byte = false;

        match result {
            Ok(Status::Waiting) => None,
            Ok(Status::Ok) => {
                slot.busy = false;
                Some(Ok(slot.reply))
            }
            Err(e) => {
                slot.busy = false;
                slot.reply.clear();
                waiter.cancel(wait_cx);
                Some(Err(e))
            }
        }
    }

    /// Poll one session. `WouldBlock` while it is suspended.
    pub fn poll<D: PinDriver>(
        &mut self,
        id: SessionId,
        pins: &mut D,
    ) -> nb::Result<ReplyBuffer, DispatchError> {
        self.check(id)?;
        if !self.admit(id.index()) {
            return Err(nb::Error::Other(DispatchError::Idle(id)));
        }
        match self.run(id.index(), pins) {
            None => Err(nb::Error::WouldBlock),
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(nb::Error::Other(e.into())),
        }
    }

    /// Admit queued commands and poll every busy session once.
    pub fn tick<D: PinDriver>(
        &mut self,
        pins: &mut D,
        mut on_complete: impl FnMut(Completion),
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        for index in 0..N {
            if !self.admit(index) {
                continue;
            }
            summary.polled += 1;
            let session = SessionId(index as u8);
            trace!("{}: poll {}", P::NAME, session);
            match self.run(index, pins) {
                None => summary.waiting += 1,
                Some(outcome) => {
                    summary.completed += 1;
                    match &outcome {
                        Ok(reply) => info!("{}: {} done, reply {:?}", P::NAME, session, reply.as_bytes()),
                        Err(e) => warn!("{}: {} failed: {}", P::NAME, session, e),
                    }
                    on_complete(Completion { session, outcome });
                }
            }
        }
        summary
    }

    /// Stop driving a session. Hardware keeps the last level written;
    /// queued commands for the session stay queued.
    pub fn abandon(&mut self, id: SessionId) -> Result<(), DispatchError> {
        self.check(id)?;
        let slot = &mut self.slots[id.index()];
        if slot.busy {
            warn!("{}: abandoning {}, outputs left as last driven", P::NAME, id);
        }
        *slot = Slot::default();
        self.waiter.cancel(id.wait_context());
        Ok(())
    }

    pub fn is_busy(&self, id: SessionId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.busy)
    }

    pub fn session_state(&self, id: SessionId) -> Option<&P::State> {
        self.slots.get(id.index()).map(|s| &s.state)
    }

    /// Direct access to a slot's persisted state, for recovery tooling.
    pub fn session_state_mut(&mut self, id: SessionId) -> Option<&mut P::State> {
        self.slots.get_mut(id.index()).map(|s| &mut s.state)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn persistent(&self) -> &P::Persistent {
        &self.persistent
    }

    pub fn waiter(&self) -> &W {
        &self.waiter
    }
}

impl<P: Plugin, C: Clock, const M: usize, const N: usize> Dispatcher<P, WaitTable<C, M>, N> {
    /// Bus completion for a session suspended on `transfer`.
    pub fn signal(&mut self, id: SessionId, transfer: Transfer) -> Result<bool, DispatchError> {
        self.check(id)?;
        Ok(self.waiter.signal(id.wait_context(), transfer))
    }
}
