#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod capture;
pub mod counters;
pub mod dma;
pub mod feeder;
pub mod inbound;
pub mod ring_buffer;
pub mod sample;

/// Output and capture frame rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Frames per DMA half: one millisecond at [`SAMPLE_RATE_HZ`].
pub const FRAMES_PER_BUFFER: usize = (SAMPLE_RATE_HZ / 1000) as usize;

/// Mono samples held between the USB OUT path and the DAC feed.
pub const RING_CAPACITY: usize = 512;

pub use capture::{InputSampleCapture, OutboundTransport};
pub use counters::{CounterSnapshot, PipelineCounters};
pub use dma::{Completion, DmaError, DoubleBufferEngine, Half, TransferChannel};
pub use feeder::{FillReport, OutputSampleFeeder, SampleSource, StaticAsset};
pub use inbound::InboundStreamWriter;
pub use ring_buffer::{RingBuffer, RingConsumer, RingProducer, RingSample, WriteHead};
pub use sample::{Gain, MonoSample, StereoFrame, adc_to_pcm};

/// Ring type shared by the USB OUT path and the DAC feeder.
pub type OutputRing = RingBuffer<MonoSample, RING_CAPACITY>;
