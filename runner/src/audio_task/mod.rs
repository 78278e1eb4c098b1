#[cfg(feature = "capture")]
pub mod capture;
pub mod output;
pub mod usb_audio;

use audio_control::{AudioControlState, AudioControlSurface};
use audio_pipeline::{FRAMES_PER_BUFFER, InboundStreamWriter, MonoSample, OutputRing, PipelineCounters};
#[cfg(feature = "test-tone")]
use audio_pipeline::StaticAsset;
#[cfg(not(feature = "test-tone"))]
use audio_pipeline::{RING_CAPACITY, RingConsumer};
use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
#[cfg(feature = "capture")]
use embassy_sync::zerocopy_channel;
use embassy_usb::Builder;
use static_cell::StaticCell;

use crate::usb::UsbDriver;
use output::OutputHardware;

pub static CONTROL_STATE: AudioControlState<CriticalSectionRawMutex> = AudioControlState::new();
pub static COUNTERS: PipelineCounters = PipelineCounters::new();

static OUTPUT_RING: StaticCell<OutputRing> = StaticCell::new();

#[cfg(not(feature = "test-tone"))]
pub type OutputSource = RingConsumer<'static, MonoSample, RING_CAPACITY>;
#[cfg(feature = "test-tone")]
pub type OutputSource = StaticAsset<'static>;

// One captured buffer period, shipped as one USB packet.
pub type MicBlock = [MonoSample; FRAMES_PER_BUFFER];
#[cfg(feature = "capture")]
const MIC_BLOCKS: usize = 4;

#[cfg(feature = "capture")]
static MIC_CHANNEL: StaticCell<zerocopy_channel::Channel<'static, CriticalSectionRawMutex, MicBlock>> =
    StaticCell::new();
#[cfg(feature = "capture")]
static MIC_BLOCK_STORAGE: StaticCell<[MicBlock; MIC_BLOCKS]> = StaticCell::new();

#[cfg(feature = "test-tone")]
const fn init_square_wave() -> [MonoSample; FRAMES_PER_BUFFER] {
    let mut arr = [0; FRAMES_PER_BUFFER];
    let half = FRAMES_PER_BUFFER / 2;
    let mut i = 0;
    while i < half {
        arr[i] = MonoSample::MIN / 4;
        i += 1;
    }
    while i < FRAMES_PER_BUFFER {
        arr[i] = MonoSample::MAX / 4;
        i += 1;
    }
    arr
}

// 1 kHz at 48 kHz.
#[cfg(feature = "test-tone")]
static SQUARE_WAVE: [MonoSample; FRAMES_PER_BUFFER] = init_square_wave();

pub struct AudioHardware {
    pub output: OutputHardware,
    #[cfg(feature = "capture")]
    pub capture: capture::CaptureHardware,
}

/// Adds the audio function to the device, starts the DMA paths and spawns
/// the USB side of the pipeline.
pub fn setup_audio(spawner: Spawner, builder: &mut Builder<'static, UsbDriver>, hardware: AudioHardware) {
    info!("Audio: Setting up...");

    let surface = AudioControlSurface::new(&CONTROL_STATE);
    let usb_hardware = usb_audio::build_audio_function(builder, surface);

    let (producer, _consumer) = OUTPUT_RING.init(OutputRing::new()).split();
    let writer = InboundStreamWriter::new(producer);

    #[cfg(not(feature = "test-tone"))]
    let source = _consumer;
    #[cfg(feature = "test-tone")]
    let source = StaticAsset::new(&SQUARE_WAVE);

    if let Err(e) = output::start(hardware.output, source, &CONTROL_STATE) {
        error!("Audio: Output failed to start: {}", e);
    }

    let (speaker_task, feedback_task, control_task) = usb_audio::create_audio_usb_tasks(
        usb_hardware.speaker_out,
        usb_hardware.feedback_in,
        writer,
        &CONTROL_STATE,
    );
    spawner.must_spawn(speaker_task);
    spawner.must_spawn(feedback_task);
    spawner.must_spawn(control_task);

    #[cfg(feature = "capture")]
    {
        let blocks = MIC_BLOCK_STORAGE.init([[0; FRAMES_PER_BUFFER]; MIC_BLOCKS]);
        let channel = MIC_CHANNEL.init(zerocopy_channel::Channel::new(blocks));
        let (sender, receiver) = channel.split();

        if let Err(e) = capture::start(hardware.capture, sender) {
            error!("Audio: Capture failed to start: {}", e);
        }
        spawner.must_spawn(usb_audio::create_microphone_task(usb_hardware.mic_in, receiver));
    }
}
