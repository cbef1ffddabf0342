#![no_std]
#![no_main]

use panic_halt as _;
use rp_pico::entry;
use rp_pico::hal;
use rp_pico::hal::pac;

use hal::multicore::{Multicore, Stack};
use nuggetsynth::transport::BufferPool;

mod fifo;
mod run;

/// Buffers in flight between the two cores
const NUM_BUFFERS: usize = 5;
/// Frames per buffer
const BUFFER_LEN: usize = 64;

type Pool = BufferPool<NUM_BUFFERS, BUFFER_LEN>;

static POOL: Pool = Pool::new();

static mut CORE1_STACK: Stack<4096> = Stack::new();

#[entry]
fn start() -> ! {
    let Some(mut pac) = pac::Peripherals::take() else {
        run::halt()
    };
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        run::halt()
    };
    let mut sio = hal::Sio::new(pac.SIO);
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
    let cores = mc.cores();
    // SAFETY: the only reference to CORE1_STACK, taken once before core 1 starts
    let stack = unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK.mem) };
    if cores[1].spawn(stack, run::render).is_err() {
        run::halt()
    }

    let midi = run::midi_uart(pac.UART0, pins.gpio0, pins.gpio1, &mut pac.RESETS, &clocks);
    run::control(fifo::CoreFifo::new(sio.fifo), midi)
}
