use defmt::info;

use crate::audio_task::output::OutputHardware;
#[cfg(feature = "capture")]
use crate::audio_task::capture::CaptureHardware;
use crate::service_timer::ServiceTimer;
use crate::usb::UsbHardware;

pub struct Hardware<'a> {
    pub usb: UsbHardware<'a>,
    pub output: OutputHardware,
    #[cfg(feature = "capture")]
    pub capture: CaptureHardware,
    pub service_timer: ServiceTimer,
}

impl<'a> Hardware<'a> {
    pub fn get() -> Hardware<'a> {
        info!("Initializing");
        let peripherals = embassy_stm32::init(clock_config());

        let usb = crate::get_usb_hardware!(peripherals);
        let output = crate::get_output_hardware!(peripherals);
        #[cfg(feature = "capture")]
        let capture = crate::get_capture_hardware!(peripherals);
        let service_timer = crate::get_service_timer!(peripherals);

        Hardware {
            usb,
            output,
            #[cfg(feature = "capture")]
            capture,
            service_timer,
        }
    }
}

const HSI_HZ: u32 = 64_000_000;

/// PLL3 P output feeding SAI1.
pub const SAI_KERNEL_CLOCK_HZ: u32 = HSI_HZ / 16 * 96 / 25;

/// Kernel clock of the APB1 timers: PLL1 P over the AHB prescaler. The timer
/// multiplier undoes the APB1 prescaler.
pub const TIMER_CLOCK_HZ: u32 = HSI_HZ / 4 * 48 / 2 / 2;

fn clock_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();
    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;
    config.rcc.hsi48 = Some(Hsi48Config { sync_from_usb: true }); // needed for USB
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL48,
        divp: Some(PllDiv::DIV2), // 384 MHz
        divq: None,
        divr: None,
    });
    config.rcc.pll2 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL25,
        divp: Some(PllDiv::DIV8), // 50 MHz ADC kernel clock
        divq: None,
        divr: None,
    });
    // SAI kernel clock: 64 MHz / 16 * 96 / 25 = 15.36 MHz, which is 320 times
    // the 48 kHz frame rate.
    config.rcc.pll3 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV16,
        mul: PllMul::MUL96,
        divp: Some(PllDiv::DIV25),
        divq: None,
        divr: None,
    });
    // Timers run at 192 MHz, an exact multiple of the sample rate.
    config.rcc.sys = Sysclk::PLL1_P; // 384 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 192 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 96 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 96 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 96 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 96 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;
    config.rcc.mux.usbsel = mux::Usbsel::HSI48;
    config.rcc.mux.sai1sel = mux::Saisel::PLL3_P;
    config.rcc.mux.adcsel = mux::Adcsel::PLL2_P;
    config
}
