//! DAC feed: SAI1 block A, master transmitter, driven by a double-buffered
//! DMA stream.
//!
//! Pins (AF6): PE4 FS_A, PE5 SCK_A, PE6 SD_A.

use core::cell::RefCell;

use audio_control::AudioControlState;
use audio_pipeline::{
    DmaError, DoubleBufferEngine, FRAMES_PER_BUFFER, OutputSampleFeeder, SAMPLE_RATE_HZ, StereoFrame,
};
use defmt::info;
use embassy_stm32::gpio::Pin;
use embassy_stm32::pac;
use embassy_stm32::pac::dma::vals::Dir;
use embassy_stm32::pac::sai::vals as sai;
use embassy_stm32::{Peri, peripherals};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;

use super::{COUNTERS, OutputSource};
use crate::dma_stream::{DbmStream, DbmTarget};
use crate::hardware::SAI_KERNEL_CLOCK_HZ;

const SAI1_A_REQUEST: u8 = 87;
const PIN_AF: u8 = 6;

// 15.36 MHz kernel clock / 5 = 3.072 MHz bit clock, 64 bits per frame.
const FRAME_BITS: u8 = 64;
const MCKDIV: u8 = 5;

const _: () = assert!(SAI_KERNEL_CLOCK_HZ / MCKDIV as u32 / FRAME_BITS as u32 == SAMPLE_RATE_HZ);
const _: () = assert!(SAI_KERNEL_CLOCK_HZ % (MCKDIV as u32 * FRAME_BITS as u32) == 0);

pub struct OutputHardware {
    pub sai: Peri<'static, peripherals::SAI1>,
    pub fs: Peri<'static, peripherals::PE4>,
    pub sck: Peri<'static, peripherals::PE5>,
    pub sd: Peri<'static, peripherals::PE6>,
    pub dma: Peri<'static, peripherals::DMA1_CH0>,
}

#[macro_export]
macro_rules! get_output_hardware {
    ($peripherals:ident) => {{
        $crate::audio_task::output::OutputHardware {
            sai: $peripherals.SAI1,
            fs: $peripherals.PE4,
            sck: $peripherals.PE5,
            sd: $peripherals.PE6,
            dma: $peripherals.DMA1_CH0,
        }
    }};
}

type OutputEngine = DoubleBufferEngine<'static, DbmTarget<StereoFrame>, FRAMES_PER_BUFFER>;

struct OutputContext {
    engine: OutputEngine,
    feeder: OutputSampleFeeder<'static, OutputSource>,
    control: &'static AudioControlState<CriticalSectionRawMutex>,
    _hardware: OutputHardware,
}

impl OutputContext {
    fn service(&mut self) {
        while let Some(mut completion) = self.engine.on_interrupt() {
            let gain = self.control.gain();
            self.feeder.fill(completion.buffer(), gain);
        }
    }
}

static OUTPUT: Mutex<CriticalSectionRawMutex, RefCell<Option<OutputContext>>> = Mutex::new(RefCell::new(None));
static BUFFERS: StaticCell<[[StereoFrame; FRAMES_PER_BUFFER]; 2]> = StaticCell::new();

/// Refills whichever output half has completed. Runs in the service
/// interrupt.
pub fn service() {
    OUTPUT.lock(|output| {
        if let Some(context) = output.borrow_mut().as_mut() {
            context.service();
        }
    });
}

/// Brings up the SAI, starts the DMA chain on silence and hands the engine to
/// the service interrupt.
pub fn start(
    hardware: OutputHardware,
    source: OutputSource,
    control: &'static AudioControlState<CriticalSectionRawMutex>,
) -> Result<(), DmaError> {
    for pin in [hardware.fs.pin(), hardware.sck.pin(), hardware.sd.pin()] {
        set_alternate(pin as usize);
    }
    configure_sai();

    let [a, b] = BUFFERS.init([[StereoFrame::SILENCE; FRAMES_PER_BUFFER]; 2]);
    let stream = DbmStream::new(
        pac::DMA1,
        0,
        0,
        SAI1_A_REQUEST,
        pac::SAI1.ch(0).dr().as_ptr() as u32,
        Dir::MEMORY_TO_PERIPHERAL,
    );
    let mut engine = DoubleBufferEngine::init(a, b, stream.targets());
    engine.start()?;

    // The SAI requests its first words once enabled, so the stream must be
    // running first.
    pac::SAI1.ch(0).cr1().modify(|w| w.set_saien(true));

    OUTPUT.lock(|output| {
        output.replace(Some(OutputContext {
            engine,
            feeder: OutputSampleFeeder::new(source, &COUNTERS),
            control,
            _hardware: hardware,
        }))
    });

    control.set_clock_valid(true);
    info!("Output: SAI running, {} frames per half", FRAMES_PER_BUFFER);
    Ok(())
}

fn set_alternate(pin: usize) {
    let gpio = pac::GPIOE;
    gpio.moder()
        .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ALTERNATE));
    gpio.ospeedr()
        .modify(|w| w.set_ospeedr(pin, pac::gpio::vals::Ospeedr::VERY_HIGH_SPEED));
    gpio.afr(pin / 8).modify(|w| w.set_afr(pin % 8, PIN_AF));
}

fn configure_sai() {
    pac::RCC.apb2enr().modify(|w| w.set_sai1en(true));

    let block = pac::SAI1.ch(0);
    block.cr1().modify(|w| w.set_saien(false));
    while block.cr1().read().saien() {}

    block.cr2().write(|w| {
        w.set_fflush(true);
        w.set_fth(sai::Fth::QUARTER1);
    });
    // I2S-style framing: FS low for the left slot, asserted one bit early.
    block.frcr().write(|w| {
        w.set_frl(FRAME_BITS - 1);
        w.set_fsall(FRAME_BITS / 2 - 1);
        w.set_fsdef(true);
        w.set_fspol(sai::Fspol::FALLING_EDGE);
        w.set_fsoff(sai::Fsoff::BEFORE_FIRST);
    });
    block.slotr().write(|w| {
        w.set_fboff(0);
        w.set_slotsz(sai::Slotsz::DATA_SIZE);
        w.set_nbslot(1);
        w.set_sloten(sai::Sloten::from_bits(0b11));
    });
    block.cr1().write(|w| {
        w.set_mode(sai::Mode::MASTER_TX);
        w.set_prtcfg(sai::Prtcfg::FREE);
        w.set_ds(sai::Ds::BIT32);
        w.set_ckstr(sai::Ckstr::FALLING_EDGE);
        w.set_syncen(sai::Syncen::ASYNCHRONOUS);
        w.set_nodiv(true);
        w.set_mckdiv(sai::Mckdiv::from_bits(MCKDIV));
        w.set_dmaen(true);
    });
}
