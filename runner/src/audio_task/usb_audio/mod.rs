pub mod hardware;

use core::sync::atomic::{AtomicUsize, Ordering};

use audio_control::{AudioControlState, ControlChange, FeedbackCalculator};
use audio_pipeline::{InboundStreamWriter, MonoSample, RING_CAPACITY};
use defmt::{info, warn};
use embassy_executor::SpawnToken;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
#[cfg(feature = "capture")]
use embassy_sync::zerocopy_channel;
use embassy_usb::driver::{Endpoint, EndpointError, EndpointIn, EndpointOut};

use hardware::{FEEDBACK_FORMAT, SPEAKER_MAX_PACKET_SIZE};

pub use hardware::build_audio_function;

type Writer = InboundStreamWriter<'static, MonoSample, RING_CAPACITY>;

/// Ring fill level as last seen by the OUT path, for the feedback endpoint.
static FILL_LEVEL: AtomicUsize = AtomicUsize::new(0);

struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => {
                warn!("Packet larger than the read buffer, restarting the session");
                Disconnected {}
            }
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Moves host packets into the output ring.
async fn speaker_handler(endpoint: &mut hardware::EndpointOut, writer: &mut Writer) -> Result<(), Disconnected> {
    let mut packet = [0u8; SPEAKER_MAX_PACKET_SIZE];
    let mut packet_count = 0u32;

    loop {
        let len = endpoint.read(&mut packet).await?;
        let written = writer.write(&packet[..len]);
        if written * size_of::<MonoSample>() != len {
            warn!("USB Audio: Dropped a partial sample ({} bytes)", len);
        }
        FILL_LEVEL.store(writer.fill_level(), Ordering::Relaxed);

        packet_count = packet_count.wrapping_add(1);
        if packet_count % 1000 == 0 {
            info!("USB Audio: Received {} packets, ring at {}", packet_count, writer.fill_level());
        }
    }
}

#[embassy_executor::task]
async fn speaker_task(mut endpoint: hardware::EndpointOut, mut writer: Writer) {
    loop {
        endpoint.wait_enabled().await;
        info!("USB Audio: Speaker streaming active");

        _ = speaker_handler(&mut endpoint, &mut writer).await;

        info!("USB Audio: Speaker stream stopped");
    }
}

async fn feedback_handler(
    endpoint: &mut hardware::EndpointIn,
    calculator: &FeedbackCalculator,
    control_state: &AudioControlState<CriticalSectionRawMutex>,
) -> Result<(), Disconnected> {
    loop {
        let value = calculator.value(
            control_state.sample_rate(),
            FILL_LEVEL.load(Ordering::Relaxed),
            RING_CAPACITY,
        );
        endpoint.write(value.as_bytes()).await?;
    }
}

/// Reports the device's consumption rate to the host.
#[embassy_executor::task]
async fn feedback_task(
    mut endpoint: hardware::EndpointIn,
    control_state: &'static AudioControlState<CriticalSectionRawMutex>,
) {
    let calculator = FeedbackCalculator::new(FEEDBACK_FORMAT);
    loop {
        endpoint.wait_enabled().await;
        info!("USB Audio: Feedback active");

        _ = feedback_handler(&mut endpoint, &calculator, control_state).await;
    }
}

#[cfg(feature = "capture")]
type MicReceiver = zerocopy_channel::Receiver<'static, CriticalSectionRawMutex, super::MicBlock>;

/// Handles streaming of captured audio to the host.
#[cfg(feature = "capture")]
async fn microphone_handler(endpoint: &mut hardware::EndpointIn, receiver: &mut MicReceiver) -> Result<(), Disconnected> {
    let mut usb_data = [0u8; hardware::MIC_PACKET_SIZE];

    // Blocks captured while the host was not listening are stale.
    while receiver.try_receive().is_some() {
        receiver.receive_done();
    }

    loop {
        let samples = receiver.receive().await;
        usb_data.copy_from_slice(bytemuck::cast_slice(samples.as_slice()));
        // Release the block before writing, so capture can reuse it.
        receiver.receive_done();

        endpoint.write(&usb_data).await?;
    }
}

#[cfg(feature = "capture")]
#[embassy_executor::task]
async fn microphone_task(mut endpoint: hardware::EndpointIn, mut receiver: MicReceiver) {
    loop {
        endpoint.wait_enabled().await;
        info!("USB Audio: Microphone streaming active");

        _ = microphone_handler(&mut endpoint, &mut receiver).await;

        info!("USB Audio: Microphone stream stopped");
    }
}

/// Logs accepted control changes.
#[embassy_executor::task]
async fn usb_control_task(control_state: &'static AudioControlState<CriticalSectionRawMutex>) {
    info!("USB Audio: Control task starting...");
    loop {
        match control_state.changed().await {
            ControlChange::Mute { channel, muted } => {
                info!("USB Audio: Channel {} muted: {}", channel, muted);
            }
            ControlChange::Volume { channel, volume } => {
                info!("USB Audio: Channel {} gain: {} dB (raw: {})", channel, volume / 256, volume);
            }
            ControlChange::SampleRate(rate) => info!("USB Audio: Sample rate: {} Hz", rate),
            ControlChange::ClockValid(valid) => info!("USB Audio: Clock valid: {}", valid),
            ControlChange::Reset => info!("USB Audio: Controls reset"),
        }
    }
}

pub fn create_audio_usb_tasks(
    speaker_out: hardware::EndpointOut,
    feedback_in: hardware::EndpointIn,
    writer: Writer,
    control_state: &'static AudioControlState<CriticalSectionRawMutex>,
) -> (SpawnToken<impl Sized>, SpawnToken<impl Sized>, SpawnToken<impl Sized>) {
    info!("USB Audio: Creating tasks...");

    let speaker_task = speaker_task(speaker_out, writer);
    let feedback_task = feedback_task(feedback_in, control_state);
    let control_task = usb_control_task(control_state);

    info!("USB Audio: Tasks created successfully");

    (speaker_task, feedback_task, control_task)
}

#[cfg(feature = "capture")]
pub fn create_microphone_task(endpoint: hardware::EndpointIn, receiver: MicReceiver) -> SpawnToken<impl Sized> {
    microphone_task(endpoint, receiver)
}
