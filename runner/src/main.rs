#![no_std]
#![no_main]

mod audio_task;
#[cfg(feature = "console")]
mod console_task;
mod dma_stream;
mod hardware;
mod service_timer;
mod usb;

use defmt::info;
use embassy_executor::Executor;
use static_cell::StaticCell;

use defmt_rtt as _;
use panic_probe as _;

use audio_task::AudioHardware;

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let hardware = hardware::Hardware::get();

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        let mut builder = usb::create_builder(hardware.usb);

        audio_task::setup_audio(
            spawner,
            &mut builder,
            AudioHardware {
                output: hardware.output,
                #[cfg(feature = "capture")]
                capture: hardware.capture,
            },
        );

        #[cfg(feature = "console")]
        {
            let console_hardware = crate::get_console_hardware!(&mut builder);
            spawner.must_spawn(console_task::create_console_task(console_hardware));
        }

        spawner.must_spawn(usb::usb_task(builder.build()));

        // Engines are in place, so the service interrupt can start polling.
        hardware.service_timer.start();

        info!("Audio interface running");
    })
}
