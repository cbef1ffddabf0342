use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use rp_pico::hal;
use rp_pico::hal::fugit::RateExtU32;
use rp_pico::hal::gpio::bank0::{Gpio0, Gpio1};
use rp_pico::hal::gpio::{FunctionNull, FunctionUart, Pin, PullDown};
use rp_pico::hal::pac;
use rp_pico::hal::uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral};
use rp_pico::hal::Clock;

use nuggetsynth::context::Context;
use nuggetsynth::dispatch::{AudioCallbacks, ControlCore, RenderCore};
use nuggetsynth::engine::{Engine, EngineConfig};
use nuggetsynth::midi::MidiDecoder;

use crate::fifo::CoreFifo;
use crate::{BUFFER_LEN, NUM_BUFFERS, POOL};

const MIDI_BAUD: u32 = 31_250;

type Control = ControlCore<'static, CoreFifo, NUM_BUFFERS, BUFFER_LEN>;
type MidiPins = (
    Pin<Gpio0, FunctionUart, PullDown>,
    Pin<Gpio1, FunctionUart, PullDown>,
);
pub type MidiUart = UartPeripheral<Enabled, pac::UART0, MidiPins>;

/// Shared with the audio driver's interrupt
static CONTROL: Mutex<RefCell<Option<Control>>> = Mutex::new(RefCell::new(None));

pub fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}

pub fn midi_uart(
    uart: pac::UART0,
    tx: Pin<Gpio0, FunctionNull, PullDown>,
    rx: Pin<Gpio1, FunctionNull, PullDown>,
    resets: &mut pac::RESETS,
    clocks: &hal::clocks::ClocksManager,
) -> MidiUart {
    let pins = (tx.into_function(), rx.into_function());
    let config = UartConfig::new(MIDI_BAUD.Hz(), DataBits::Eight, None, StopBits::One);
    match UartPeripheral::new(uart, pins, resets).enable(config, clocks.peripheral_clock.freq()) {
        Ok(uart) => uart,
        Err(_) => halt(),
    }
}

/// Core 1: render forever
pub fn render() {
    // SAFETY: core 1 only touches its own end of the SIO FIFO
    let pac = unsafe { pac::Peripherals::steal() };
    let sio = hal::Sio::new(pac.SIO);
    let engine = match Engine::new(Context::new_480(), EngineConfig::default()) {
        Ok(engine) => engine,
        Err(_) => halt(),
    };
    RenderCore::new(CoreFifo::new(sio.fifo), &POOL, engine).run()
}

/// Core 0: hand out every buffer, then feed MIDI to the render core while the
/// audio driver pulls blocks through [nugget_audio_out]
pub fn control(fifo: CoreFifo, midi: MidiUart) -> ! {
    let mut control = Control::new(fifo, &POOL);
    control.start();
    cortex_m::interrupt::free(|cs| CONTROL.borrow(cs).replace(Some(control)));
    let mut decoder = MidiDecoder::new();
    let mut byte = [0u8];
    loop {
        let Ok(1) = midi.read_raw(&mut byte) else {
            continue;
        };
        // decode with interrupts on; only the FIFO hand-off is shared
        if let Some(raw) = decoder.push(byte[0]) {
            cortex_m::interrupt::free(|cs| {
                if let Some(control) = CONTROL.borrow(cs).borrow_mut().as_mut() {
                    control.send_midi(raw);
                }
            });
        }
    }
}

/// Called by the audio output driver whenever it needs the next block.
/// Never blocks: a null buffer and a zero count mean "play silence".
///
/// # Safety
///
/// `buffer` and `count` must each be null or valid for a write.  The block
/// stays valid until the next call.
#[no_mangle]
pub unsafe extern "C" fn nugget_audio_out(buffer: *mut *const u32, count: *mut u32) {
    let block = cortex_m::interrupt::free(|cs| {
        let mut control = CONTROL.borrow(cs).borrow_mut();
        let block = control
            .as_mut()
            .and_then(|control| control.produce_block())
            .map(|block| (block.as_ptr(), block.len() as u32));
        block
    });
    let (ptr, len) = block.unwrap_or((core::ptr::null(), 0));
    if !buffer.is_null() {
        buffer.write(ptr);
    }
    if !count.is_null() {
        count.write(len);
    }
}
