use defmt::info;
use embassy_stm32::bind_interrupts;
use embassy_stm32::peripherals;
use embassy_stm32::usb;
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(pub struct Irqs {
    OTG_HS => usb::InterruptHandler<peripherals::USB_OTG_HS>;
});

pub type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_HS>;

pub struct UsbHardware<'d> {
    pub driver: usb::Driver<'d, peripherals::USB_OTG_HS>,
    pub config_descriptor: &'d mut [u8; 512],
    pub bos_descriptor: &'d mut [u8; 32],
    pub control_buf: &'d mut [u8; 64],
}

pub static CONFIG_DESCRIPTOR: StaticCell<[u8; 512]> = StaticCell::new();
pub static BOS_DESCRIPTOR: StaticCell<[u8; 32]> = StaticCell::new();
pub static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
// 64 control + speaker packets + console packets
pub static EP_OUT_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();

#[macro_export]
macro_rules! get_usb_hardware {
    ($peripherals:ident) => {{
        let config_descriptor = $crate::usb::CONFIG_DESCRIPTOR.init([0; 512]);
        let bos_descriptor = $crate::usb::BOS_DESCRIPTOR.init([0; 32]);
        let control_buf = $crate::usb::CONTROL_BUF.init([0; 64]);
        let ep_out_buffer = $crate::usb::EP_OUT_BUFFER.init([0u8; 512]);

        // Create the USB driver
        let mut usb_config = embassy_stm32::usb::Config::default();
        usb_config.vbus_detection = false;

        let driver = embassy_stm32::usb::Driver::new_fs(
            $peripherals.USB_OTG_HS,
            $crate::usb::Irqs,
            $peripherals.PA12,
            $peripherals.PA11,
            ep_out_buffer,
            usb_config,
        );

        $crate::usb::UsbHardware {
            driver,
            config_descriptor,
            bos_descriptor,
            control_buf,
        }
    }};
}

/// Starts the device description. The audio function and the console add
/// their interfaces before [`Builder::build`] is called.
pub fn create_builder(hardware: UsbHardware<'static>) -> Builder<'static, UsbDriver> {
    let mut config = embassy_usb::Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("Embassy");
    config.product = Some("USB audio interface");
    config.serial_number = Some("12345678");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    // Interface association descriptors for the audio function and the
    // CDC-ACM console.
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;

    Builder::new(
        hardware.driver,
        config,
        hardware.config_descriptor,
        hardware.bos_descriptor,
        &mut [], // no msos descriptors
        hardware.control_buf,
    )
}

#[embassy_executor::task]
pub async fn usb_task(mut usb_device: UsbDevice<'static, UsbDriver>) {
    info!("USB: device running");
    usb_device.run().await;
}
