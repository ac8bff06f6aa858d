// stepwise demo firmware (ESP32-C3)
//
// Boot sequence: logger -> clocks -> time driver -> pins -> plugins
// Main loop: tick every dispatcher -> resubmit finished commands ->
// sleep until the earliest pending wait deadline -> repeat
//
// The status LED runs the blink plugin, AUX_OUT_0 runs the ramp plugin.
// Both dispatchers share one output bank; neither ever blocks, the only
// place the CPU waits is the idle sleep at the bottom of the loop.

#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level as GpioLevel, Output, OutputConfig};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};
use static_cell::StaticCell;

use embassy_time::Instant;
use stepwise::board::pins;
use stepwise::drivers::{OutputBank, Request};
use stepwise::kernel::{Dispatcher, EmbassyClock, SessionId, WaitTable};
use stepwise::plugins::{Blink, PinConfig, Ramp};

esp_bootloader_esp_idf::esp_app_desc!();

const SESSIONS: usize = 1;
const SESSION: SessionId = SessionId(0);

const BLINK_REQ: Request = Request::new(5, 250);
const RAMP_REQ: Request = Request::new(3, 100);

type Bank = OutputBank<Output<'static>, 2>;
type Waits = WaitTable<EmbassyClock, SESSIONS>;

static BLINKER: StaticCell<Dispatcher<Blink, Waits, SESSIONS>> = StaticCell::new();
static RAMPER: StaticCell<Dispatcher<Ramp, Waits, SESSIONS>> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("booting...");

    // esp-rtos backs embassy-time, which EmbassyClock reads
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);
    info!("time driver started.");

    let led = Output::new(peripherals.GPIO8, GpioLevel::Low, OutputConfig::default());
    let aux = Output::new(peripherals.GPIO4, GpioLevel::Low, OutputConfig::default());
    let mut bank: Bank = OutputBank::new([(pins::STATUS_LED, led), (pins::AUX_OUT_0, aux)]);

    let blinker = BLINKER.init(
        Dispatcher::register(
            Blink::new(PinConfig::new(pins::STATUS_LED)),
            WaitTable::new(EmbassyClock),
            &mut bank,
        )
        .expect("blink plugin config"),
    );
    let ramper = RAMPER.init(
        Dispatcher::register(
            Ramp::new(PinConfig::new(pins::AUX_OUT_0)),
            WaitTable::new(EmbassyClock),
            &mut bank,
        )
        .expect("ramp plugin config"),
    );
    info!("plugins registered.");

    let _ = blinker.submit(SESSION, &BLINK_REQ.encode());
    let _ = ramper.submit(SESSION, &RAMP_REQ.encode());

    loop {
        let mut blink_done = false;
        blinker.tick(&mut bank, |c| {
            if let Err(e) = c.outcome {
                warn!("blink: {}", e);
            }
            blink_done = true;
        });
        if blink_done {
            let _ = blinker.submit(SESSION, &BLINK_REQ.encode());
        }

        let mut ramp_done = false;
        ramper.tick(&mut bank, |c| {
            if let Err(e) = c.outcome {
                warn!("ramp: {}", e);
            }
            ramp_done = true;
        });
        if ramp_done {
            let _ = ramper.submit(SESSION, &RAMP_REQ.encode());
        }

        // idle until the earliest wait can be satisfied
        let next = [
            blinker.waiter().next_deadline(),
            ramper.waiter().next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min();
        if let Some(at) = next {
            let now = Instant::now();
            if at > now {
                embassy_time::block_for(at - now);
            }
        }
    }
}
