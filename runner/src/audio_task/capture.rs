//! Microphone capture: ADC1 on PC0, triggered at the sample rate by TIM6 and
//! drained by a double-buffered DMA stream.

use core::cell::RefCell;

use audio_pipeline::{DmaError, DoubleBufferEngine, FRAMES_PER_BUFFER, InputSampleCapture, SAMPLE_RATE_HZ};
use defmt::info;
use embassy_stm32::adc::{Adc, Resolution};
use embassy_stm32::pac;
use embassy_stm32::pac::adc::vals as adc;
use embassy_stm32::pac::dma::vals::Dir;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::Timer;
use embassy_stm32::{Peri, peripherals};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::zerocopy_channel;
use static_cell::StaticCell;

use super::{COUNTERS, MicBlock};
use crate::dma_stream::{DbmStream, DbmTarget};
use crate::hardware::TIMER_CLOCK_HZ;

const ADC1_REQUEST: u8 = 9;
// PC0 is ADC1_INP10.
const ADC_CHANNEL: usize = 10;
// EXTSEL code of TIM6_TRGO.
const TIM6_TRGO: u8 = 13;

// TIM6 must hit the sample rate exactly, not the nearest divider.
const _: () = assert!(TIMER_CLOCK_HZ % SAMPLE_RATE_HZ == 0);

pub struct CaptureHardware {
    pub adc: Peri<'static, peripherals::ADC1>,
    pub pin: Peri<'static, peripherals::PC0>,
    pub timer: Peri<'static, peripherals::TIM6>,
    pub dma: Peri<'static, peripherals::DMA1_CH1>,
}

#[macro_export]
macro_rules! get_capture_hardware {
    ($peripherals:ident) => {{
        $crate::audio_task::capture::CaptureHardware {
            adc: $peripherals.ADC1,
            pin: $peripherals.PC0,
            timer: $peripherals.TIM6,
            dma: $peripherals.DMA1_CH1,
        }
    }};
}

type Sender = zerocopy_channel::Sender<'static, CriticalSectionRawMutex, MicBlock>;
type CaptureEngine = DoubleBufferEngine<'static, DbmTarget<u16>, FRAMES_PER_BUFFER>;

struct CaptureContext {
    engine: CaptureEngine,
    capture: InputSampleCapture<'static, Sender>,
    // Held so the converter and its trigger stay powered.
    _adc: Adc<'static, peripherals::ADC1>,
    _timer: Timer<'static, peripherals::TIM6>,
    _pin: Peri<'static, peripherals::PC0>,
    _dma: Peri<'static, peripherals::DMA1_CH1>,
}

impl CaptureContext {
    fn service(&mut self) {
        while let Some(mut completion) = self.engine.on_interrupt() {
            self.capture.on_completion(completion.buffer());
        }
    }
}

static CAPTURE: Mutex<CriticalSectionRawMutex, RefCell<Option<CaptureContext>>> = Mutex::new(RefCell::new(None));
static BUFFERS: StaticCell<[[u16; FRAMES_PER_BUFFER]; 2]> = StaticCell::new();

/// Ships whichever capture half has completed. Runs in the service interrupt.
pub fn service() {
    CAPTURE.lock(|capture| {
        if let Some(context) = capture.borrow_mut().as_mut() {
            context.service();
        }
    });
}

pub fn start(hardware: CaptureHardware, sender: Sender) -> Result<(), DmaError> {
    // Power-up and calibration are left to the HAL; the conversion sequence
    // is set up on the registers.
    let mut adc = Adc::new(hardware.adc);
    adc.set_resolution(Resolution::BITS12);
    configure_adc();

    let [a, b] = BUFFERS.init([[0; FRAMES_PER_BUFFER]; 2]);
    let stream = DbmStream::new(
        pac::DMA1,
        1,
        1,
        ADC1_REQUEST,
        pac::ADC1.dr().as_ptr() as u32,
        Dir::PERIPHERAL_TO_MEMORY,
    );
    let mut engine = DoubleBufferEngine::init(a, b, stream.targets());
    engine.start()?;

    // Conversions wait for the first trigger edge.
    pac::ADC1.cr().modify(|w| w.set_adstart(true));

    let timer = Timer::new(hardware.timer);
    timer.set_frequency(Hertz(SAMPLE_RATE_HZ));
    timer
        .regs_basic()
        .cr2()
        .modify(|w| w.set_mms(pac::timer::vals::Mms::UPDATE));
    timer.start();

    CAPTURE.lock(|capture| {
        capture.replace(Some(CaptureContext {
            engine,
            capture: InputSampleCapture::new(sender, &COUNTERS),
            _adc: adc,
            _timer: timer,
            _pin: hardware.pin,
            _dma: hardware.dma,
        }))
    });

    info!("Capture: ADC1 channel {} at {} Hz", ADC_CHANNEL, SAMPLE_RATE_HZ);
    Ok(())
}

fn configure_adc() {
    let regs = pac::ADC1;
    regs.pcsel().modify(|w| w.set_pcsel(ADC_CHANNEL, adc::Pcsel::PRESELECTED));
    regs.smpr(ADC_CHANNEL / 10)
        .modify(|w| w.set_smp(ADC_CHANNEL % 10, adc::SampleTime::CYCLES64_5));
    regs.sqr1().write(|w| {
        w.set_l(0);
        w.set_sq(0, ADC_CHANNEL as u8);
    });
    regs.cfgr().modify(|w| {
        w.set_cont(false);
        w.set_exten(adc::Exten::RISING_EDGE);
        w.set_extsel(TIM6_TRGO);
        w.set_dmngt(adc::Dmngt::DMA_CIRCULAR);
    });
}
