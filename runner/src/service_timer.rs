//! Highest-priority periodic interrupt that services both DMA engines.
//!
//! It polls four times per buffer period, so a completed half is refilled
//! (or shipped) at most a quarter period after the hardware switched away
//! from it.

use defmt::info;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::Timer;
use embassy_stm32::{Peri, pac, peripherals};
use static_cell::StaticCell;

pub const SERVICE_RATE_HZ: u32 = 4 * 1000;

pub struct ServiceTimer {
    pub timer: Peri<'static, peripherals::TIM7>,
}

#[macro_export]
macro_rules! get_service_timer {
    ($peripherals:ident) => {{
        $crate::service_timer::ServiceTimer {
            timer: $peripherals.TIM7,
        }
    }};
}

static TIMER: StaticCell<Timer<'static, peripherals::TIM7>> = StaticCell::new();

impl ServiceTimer {
    pub fn start(self) {
        let timer = TIMER.init(Timer::new(self.timer));
        timer.set_frequency(Hertz(SERVICE_RATE_HZ));
        timer.enable_update_interrupt(true);

        interrupt::TIM7.set_priority(Priority::P0);
        // SAFETY: the handler below only touches state behind critical
        // sections.
        unsafe { interrupt::TIM7.enable() };

        timer.start();
        info!("Service timer: polling at {} Hz", SERVICE_RATE_HZ);
    }
}

#[interrupt]
unsafe fn TIM7() {
    pac::TIM7.sr().write(|w| w.set_uif(false));

    crate::audio_task::output::service();
    #[cfg(feature = "capture")]
    crate::audio_task::capture::service();
}
