mod common;

use common::{Event, Harness};
use stepwise::drivers::{Level, Request};
use stepwise::kernel::{Label, PluginError, ResumePoint, Status};
use stepwise::plugins::ramp::RampAt;
use stepwise::plugins::{PinConfig, Ramp};

const LED: u16 = 4;

fn ramp() -> Harness<Ramp> {
    Harness::new(Ramp::new(PinConfig::new(LED)))
}

#[test]
fn count_two_walks_up_then_down() {
    let mut h = ramp();
    let cmd = Request::new(2, 7).encode();

    // (label, i1) observed at every suspension
    let mut stops = Vec::new();
    let mut first = true;
    let result = loop {
        let status = h.call(&cmd, first);
        first = false;
        match status {
            Ok(Status::Waiting) => {
                let at = RampAt::decode(h.state.resume_point).unwrap();
                stops.push((at, h.state.counters.i1));
                h.waiter.satisfy(h.cx);
            }
            other => break other,
        }
    };

    assert_eq!(result, Ok(Status::Ok));
    assert_eq!(h.reply.as_bytes(), &[0]);

    let phases: Vec<_> = stops
        .iter()
        .filter(|(at, _)| matches!(at, RampAt::Ascending | RampAt::Descending))
        .copied()
        .collect();
    assert_eq!(
        phases,
        vec![
            (RampAt::Ascending, 0),
            (RampAt::Ascending, 1),
            (RampAt::Descending, 1),
            (RampAt::Descending, 0),
        ]
    );
    assert_eq!(stops.len(), 4 + 4);
    assert_eq!(h.state.counters.i, 2);

    let writes: Vec<_> = h
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Write(..)))
        .collect();
    assert_eq!(
        writes,
        vec![
            Event::Write(LED, Level::High),
            Event::Write(LED, Level::Low),
            Event::Write(LED, Level::High),
            Event::Write(LED, Level::Low),
        ]
    );
}

#[test]
fn ascending_phase_reaches_count_before_descending() {
    let mut h = ramp();
    let cmd = Request::new(3, 1).encode();
    let mut first = true;
    let mut peak = 0;
    loop {
        match h.call(&cmd, first) {
            Ok(Status::Waiting) => {
                peak = peak.max(h.state.counters.i1);
                h.waiter.satisfy(h.cx);
            }
            other => {
                assert_eq!(other, Ok(Status::Ok));
                break;
            }
        }
        first = false;
    }
    // the last ascending wait is at count - 1, the first descending one
    // is right after stepping down from count
    assert_eq!(peak, 2);
    assert_eq!(h.reply.as_bytes(), &[0]);
}

#[test]
fn zero_count_skips_every_phase() {
    let mut h = ramp();
    let result = h.call(&Request::new(0, 50).encode(), true);
    assert_eq!(result, Ok(Status::Ok));
    assert_eq!(h.reply.as_bytes(), &[0]);
    assert!(h.events().is_empty());
    assert!(!h.waiter.is_armed(h.cx));
}

#[test]
fn labels_outside_the_set_are_rejected() {
    for raw in [5u8, 17, 255] {
        let mut h = ramp();
        h.state.resume_point = ResumePoint::from_raw(raw);
        let result = h.call(&[], false);
        assert_eq!(result, Err(PluginError::ProtocolViolation { resume_point: raw }));
        assert!(h.state.is_fresh());
    }
}

#[test]
fn each_phase_has_its_own_label() {
    let raws: Vec<u8> = [
        RampAt::Entry,
        RampAt::AfterHigh,
        RampAt::AfterLow,
        RampAt::Ascending,
        RampAt::Descending,
    ]
    .iter()
    .map(|l| l.encode().raw())
    .collect();
    assert_eq!(raws, vec![0, 1, 2, 3, 4]);
}
