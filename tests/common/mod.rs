// Test doubles shared by the integration tests: a pin driver and a
// waiter that write into one ordered trace, and a waiter whose waits
// are satisfied only when the test says so.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::Duration;
use stepwise::drivers::{Level, PinDriver, PinId, PinMode, ReplyBuffer};
use stepwise::kernel::{HandlerResult, Invocation, Plugin, TimeoutWaiter, Transfer, WaitContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Init(PinId),
    Mode(PinId, PinMode),
    Write(PinId, Level),
    Wait(WaitContext, u64),
    Transfer(WaitContext, Transfer),
}

pub type Trace = Rc<RefCell<Vec<Event>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub struct RecordingPins {
    trace: Trace,
}

impl RecordingPins {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
        }
    }
}

impl PinDriver for RecordingPins {
    fn init(&mut self, pin: PinId) {
        self.trace.borrow_mut().push(Event::Init(pin));
    }

    fn set_mode(&mut self, pin: PinId, mode: PinMode) {
        self.trace.borrow_mut().push(Event::Mode(pin, mode));
    }

    fn write_digital(&mut self, pin: PinId, level: Level) {
        self.trace.borrow_mut().push(Event::Write(pin, level));
    }
}

/// Waits stay pending until `satisfy` is called for their context.
pub struct ScriptedWaiter {
    trace: Trace,
    armed: Vec<bool>,
    pub checks: usize,
}

impl ScriptedWaiter {
    pub fn new(trace: &Trace, contexts: usize) -> Self {
        Self {
            trace: trace.clone(),
            armed: vec![false; contexts],
            checks: 0,
        }
    }

    pub fn satisfy(&mut self, cx: WaitContext) {
        self.armed[cx.index()] = false;
    }

    pub fn is_armed(&self, cx: WaitContext) -> bool {
        self.armed[cx.index()]
    }
}

impl TimeoutWaiter for ScriptedWaiter {
    fn capacity(&self) -> usize {
        self.armed.len()
    }

    fn register_wait(&mut self, cx: WaitContext, duration: Duration) {
        let ms = duration.as_millis();
        self.armed[cx.index()] = true;
        self.trace.borrow_mut().push(Event::Wait(cx, ms));
    }

    fn register_transfer(&mut self, cx: WaitContext, transfer: Transfer) {
        self.armed[cx.index()] = true;
        self.trace.borrow_mut().push(Event::Transfer(cx, transfer));
    }

    fn is_still_waiting(&mut self, cx: WaitContext) -> bool {
        self.checks += 1;
        self.is_armed(cx)
    }

    fn cancel(&mut self, cx: WaitContext) {
        self.armed[cx.index()] = false;
    }
}

/// One plugin session driven by hand, without a dispatcher.
pub struct Harness<P: Plugin> {
    pub plugin: P,
    pub persistent: P::Persistent,
    pub state: P::State,
    pub pins: RecordingPins,
    pub waiter: ScriptedWaiter,
    pub reply: ReplyBuffer,
    pub cx: WaitContext,
    pub trace: Trace,
}

impl<P: Plugin> Harness<P> {
    pub fn new(plugin: P) -> Self {
        let trace = trace();
        let mut pins = RecordingPins::new(&trace);
        let mut state = P::State::default();
        plugin.handler_init().expect("handler_init");
        plugin.exec_init(&mut state, &mut pins).expect("exec_init");
        // setup events are not part of the scenarios
        trace.borrow_mut().clear();
        Self {
            plugin,
            persistent: P::Persistent::default(),
            state,
            pins,
            waiter: ScriptedWaiter::new(&trace, 1),
            reply: ReplyBuffer::new(),
            cx: WaitContext(0),
            trace,
        }
    }

    pub fn call(&mut self, command: &[u8], first_byte: bool) -> HandlerResult {
        let mut inv = Invocation {
            pins: &mut self.pins,
            waiter: &mut self.waiter,
            wait_cx: self.cx,
            command,
            reply: &mut self.reply,
            first_byte,
        };
        self.plugin
            .handler(&mut self.persistent, &mut self.state, &mut inv)
    }

    /// Drive a session to its terminal result, satisfying each wait as
    /// soon as it is registered. Returns the number of WAITING results.
    pub fn run_to_end(&mut self, command: &[u8]) -> (usize, HandlerResult) {
        let mut waiting = 0;
        let mut first = true;
        loop {
            let result = self.call(command, first);
            first = false;
            match result {
                Ok(stepwise::kernel::Status::Waiting) => {
                    waiting += 1;
                    assert!(waiting < 10_000, "session never finished");
                    self.waiter.satisfy(self.cx);
                }
                other => return (waiting, other),
            }
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.trace.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.trace
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Write(..)))
            .count()
    }
}
