use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use static_cell::StaticCell;

use crate::usb::UsbDriver;

pub const MAX_PACKET_SIZE: u16 = 64;

pub struct ConsoleHardware {
    pub class: CdcAcmClass<'static, UsbDriver>,
}

pub static STATE: StaticCell<State<'static>> = StaticCell::new();

#[macro_export]
macro_rules! get_console_hardware {
    ($builder:expr) => {{
        let state = $crate::console_task::hardware::STATE.init(embassy_usb::class::cdc_acm::State::new());
        let class = embassy_usb::class::cdc_acm::CdcAcmClass::new(
            $builder,
            state,
            $crate::console_task::hardware::MAX_PACKET_SIZE,
        );

        $crate::console_task::hardware::ConsoleHardware { class }
    }};
}
