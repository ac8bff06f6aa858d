// Waits for suspended sessions
//
// One record per wait context. A handler registers a wait right before
// it suspends and the dispatcher asks on every poll whether it is still
// pending. A timed record holds an absolute deadline so polling is a
// single compare against the clock. A transfer record stays pending
// until the bus side signals completion for that context. A satisfied
// record is cleared the first time it is observed.

use core::cell::Cell;
use core::fmt;

use embassy_time::{Duration, Instant};
use log::{trace, warn};

/// Identity a wait is registered under, one per session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitContext(pub u8);

impl WaitContext {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bus transfers a handler may block on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    SpiSend,
    SpiReceive,
    I2cSend,
    I2cReceive,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transfer::SpiSend => f.write_str("spi send"),
            Transfer::SpiReceive => f.write_str("spi receive"),
            Transfer::I2cSend => f.write_str("i2c send"),
            Transfer::I2cReceive => f.write_str("i2c receive"),
        }
    }
}

/// What a suspended session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor {
    Timeout(Duration),
    Transfer(Transfer),
}

impl fmt::Display for WaitFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitFor::Timeout(d) => write!(f, "{}ms", d.as_millis()),
            WaitFor::Transfer(t) => write!(f, "{}", t),
        }
    }
}

pub trait TimeoutWaiter {
    /// Contexts `0..capacity()` can hold a record.
    fn capacity(&self) -> usize;

    /// Arm (or re-arm) a timed wait for `cx`. Any stale record is replaced.
    fn register_wait(&mut self, cx: WaitContext, duration: Duration);

    /// Arm a wait that only completes once `transfer` is signalled for `cx`.
    fn register_transfer(&mut self, cx: WaitContext, transfer: Transfer);

    /// Non-blocking. Returns false once the wait is satisfied, and for a
    /// context that never registered one.
    fn is_still_waiting(&mut self, cx: WaitContext) -> bool;

    fn cancel(&mut self, cx: WaitContext);

    fn arm(&mut self, cx: WaitContext, wait: WaitFor) {
        match wait {
            WaitFor::Timeout(duration) => self.register_wait(cx, duration),
            WaitFor::Transfer(transfer) => self.register_transfer(cx, transfer),
        }
    }
}

impl<W: TimeoutWaiter + ?Sized> TimeoutWaiter for &mut W {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn register_wait(&mut self, cx: WaitContext, duration: Duration) {
        (**self).register_wait(cx, duration);
    }

    fn register_transfer(&mut self, cx: WaitContext, transfer: Transfer) {
        (**self).register_transfer(cx, transfer);
    }

    fn is_still_waiting(&mut self, cx: WaitContext) -> bool {
        (**self).is_still_waiting(cx)
    }

    fn cancel(&mut self, cx: WaitContext) {
        (**self).cancel(cx);
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Monotonic time from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Drives host simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            now: Cell::new(Instant::from_ticks(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitRecord {
    Deadline(Instant),
    Transfer { transfer: Transfer, done: bool },
}

/// Fixed table of wait records, indexed by [`WaitContext`].
pub struct WaitTable<C, const N: usize> {
    clock: C,
    records: [Option<WaitRecord>; N],
}

impl<C: Clock, const N: usize> WaitTable<C, N> {
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            records: [None; N],
        }
    }

    pub fn pending(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    /// Earliest deadline among armed timed records, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.records
            .iter()
            .flatten()
            .filter_map(|r| match r {
                WaitRecord::Deadline(at) => Some(*at),
                WaitRecord::Transfer { .. } => None,
            })
            .min()
    }

    /// Mark `transfer` as finished for `cx`. Returns false when `cx` is not
    /// waiting on that transfer; the signal is then dropped.
    pub fn signal(&mut self, cx: WaitContext, transfer: Transfer) -> bool {
        match self.records.get_mut(cx.index()) {
            Some(Some(WaitRecord::Transfer { transfer: armed, done })) if *armed == transfer => {
                *done = true;
                true
            }
            _ => {
                trace!("wait: context {} not waiting on {}", cx.0, transfer);
                false
            }
        }
    }

    fn arm_record(&mut self, cx: WaitContext, record: WaitRecord) {
        let Some(slot) = self.records.get_mut(cx.index()) else {
            warn!("wait: context {} out of range ({} slots)", cx.0, N);
            return;
        };
        *slot = Some(record);
    }
}

impl<C: Clock, const N: usize> TimeoutWaiter for WaitTable<C, N> {
    fn capacity(&self) -> usize {
        N
    }

    fn register_wait(&mut self, cx: WaitContext, duration: Duration) {
        let deadline = self
            .clock
            .now()
            .checked_add(duration)
            .unwrap_or(Instant::MAX);
        self.arm_record(cx, WaitRecord::Deadline(deadline));
    }

    fn register_transfer(&mut self, cx: WaitContext, transfer: Transfer) {
        self.arm_record(cx, WaitRecord::Transfer { transfer, done: false });
    }

    fn is_still_waiting(&mut self, cx: WaitContext) -> bool {
        let now = self.clock.now();
        let Some(slot) = self.records.get_mut(cx.index()) else {
            return false;
        };
        let Some(record) = *slot else {
            return false;
        };
        let pending = match record {
            WaitRecord::Deadline(deadline) => now < deadline,
            WaitRecord::Transfer { done, .. } => !done,
        };
        if !pending {
            *slot = None;
        }
        pending
    }

    fn cancel(&mut self, cx: WaitContext) {
        if let Some(slot) = self.records.get_mut(cx.index()) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_elapses_at_deadline() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 2> = WaitTable::new(&clock);
        let cx = WaitContext(0);

        table.register_wait(cx, Duration::from_millis(10));
        assert!(table.is_still_waiting(cx));
        clock.advance(Duration::from_millis(9));
        assert!(table.is_still_waiting(cx));
        assert!(table.is_still_waiting(cx));
        clock.advance(Duration::from_millis(1));
        assert!(!table.is_still_waiting(cx));
        // cleared once observed
        assert_eq!(table.pending(), 0);
        assert!(!table.is_still_waiting(cx));
    }

    #[test]
    fn contexts_do_not_interfere() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 3> = WaitTable::new(&clock);

        table.register_wait(WaitContext(0), Duration::from_millis(5));
        table.register_wait(WaitContext(2), Duration::from_millis(50));
        assert!(!table.is_still_waiting(WaitContext(1)));

        clock.advance(Duration::from_millis(5));
        assert!(!table.is_still_waiting(WaitContext(0)));
        assert!(table.is_still_waiting(WaitContext(2)));
    }

    #[test]
    fn re_register_overwrites_stale_record() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 1> = WaitTable::new(&clock);
        let cx = WaitContext(0);

        table.register_wait(cx, Duration::from_millis(100));
        table.register_wait(cx, Duration::from_millis(1));
        clock.advance(Duration::from_millis(1));
        assert!(!table.is_still_waiting(cx));
    }

    #[test]
    fn zero_duration_is_satisfied_on_first_check() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 1> = WaitTable::new(&clock);
        table.register_wait(WaitContext(0), Duration::from_millis(0));
        assert!(!table.is_still_waiting(WaitContext(0)));
    }

    #[test]
    fn next_deadline_and_cancel() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 4> = WaitTable::new(&clock);
        assert_eq!(table.next_deadline(), None);

        table.register_wait(WaitContext(1), Duration::from_millis(30));
        table.register_wait(WaitContext(3), Duration::from_millis(20));
        assert_eq!(table.next_deadline(), Some(Instant::from_millis(20)));

        table.cancel(WaitContext(3));
        assert_eq!(table.next_deadline(), Some(Instant::from_millis(30)));
        assert!(!table.is_still_waiting(WaitContext(3)));
    }

    #[test]
    fn out_of_range_context_never_waits() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 1> = WaitTable::new(&clock);
        table.register_wait(WaitContext(5), Duration::from_millis(10));
        assert!(!table.is_still_waiting(WaitContext(5)));
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn transfer_wait_ignores_the_clock_until_signalled() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 2> = WaitTable::new(&clock);
        let cx = WaitContext(1);

        table.arm(cx, WaitFor::Transfer(Transfer::I2cReceive));
        clock.advance(Duration::from_secs(60));
        assert!(table.is_still_waiting(cx));
        assert_eq!(table.next_deadline(), None);

        // wrong transfer, wrong context
        assert!(!table.signal(cx, Transfer::I2cSend));
        assert!(!table.signal(WaitContext(0), Transfer::I2cReceive));
        assert!(table.is_still_waiting(cx));

        assert!(table.signal(cx, Transfer::I2cReceive));
        assert!(!table.is_still_waiting(cx));
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn signal_before_the_wait_is_armed_is_dropped() {
        let clock = ManualClock::new();
        let mut table: WaitTable<&ManualClock, 1> = WaitTable::new(&clock);
        let cx = WaitContext(0);

        assert!(!table.signal(cx, Transfer::SpiSend));
        table.register_transfer(cx, Transfer::SpiSend);
        assert!(table.is_still_waiting(cx));
        assert_eq!(table.capacity(), 1);
    }

    #[test]
    fn embassy_clock_is_monotonic() {
        let clock = EmbassyClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
