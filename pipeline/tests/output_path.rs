//! Drives the whole output path on the host: USB bytes go through the inbound
//! writer into the ring, and a simulated DMA chain pulls them out through the
//! feeder, with the completion handler called synchronously.

use std::cell::RefCell;

use audio_pipeline::{
    DoubleBufferEngine, Gain, InboundStreamWriter, OutputSampleFeeder, PipelineCounters, RingBuffer, StereoFrame,
    TransferChannel,
};
use pretty_assertions::assert_eq;

const FRAMES: usize = 8;

#[derive(Default)]
struct Bus {
    next: [usize; 2],
    armed: [Option<(*mut StereoFrame, usize)>; 2],
    pending: [bool; 2],
    active: usize,
    clocked_out: Vec<StereoFrame>,
}

impl Bus {
    /// Clocks out the active half, flags it complete and moves on to the
    /// chained half.
    fn tick(&mut self) {
        let (ptr, len) = self.armed[self.active].expect("active half is armed");
        self.clocked_out
            .extend_from_slice(unsafe { std::slice::from_raw_parts(ptr, len) });
        self.pending[self.active] = true;
        self.active = self.next[self.active];
    }
}

struct Channel<'a> {
    id: usize,
    bus: &'a RefCell<Bus>,
}

unsafe impl TransferChannel for Channel<'_> {
    type Word = StereoFrame;

    fn configure(&mut self, next: &Self) {
        self.bus.borrow_mut().next[self.id] = next.id;
    }

    unsafe fn arm(&mut self, buffer: *mut StereoFrame, len: usize) {
        self.bus.borrow_mut().armed[self.id] = Some((buffer, len));
    }

    fn start(&mut self) {
        self.bus.borrow_mut().active = self.id;
    }

    fn completion_signal(&mut self) -> bool {
        std::mem::take(&mut self.bus.borrow_mut().pending[self.id])
    }
}

fn le_bytes(samples: impl IntoIterator<Item = i16>) -> Vec<u8> {
    samples.into_iter().flat_map(i16::to_le_bytes).collect()
}

#[test]
fn host_samples_reach_the_serial_bus_in_order_then_fall_back_to_silence() {
    let bus = RefCell::new(Bus::default());
    let counters = PipelineCounters::new();
    let mut ring = RingBuffer::<i16, 16>::new();
    let (producer, consumer) = ring.split();
    let mut writer = InboundStreamWriter::new(producer);
    let mut feeder = OutputSampleFeeder::new(consumer, &counters);

    let mut half_a = [StereoFrame { left: -1, right: -1 }; FRAMES];
    let mut half_b = [StereoFrame { left: -1, right: -1 }; FRAMES];
    let mut engine = DoubleBufferEngine::init(
        &mut half_a,
        &mut half_b,
        [Channel { id: 0, bus: &bus }, Channel { id: 1, bus: &bus }],
    );
    engine
        .with_buffers(|a, b| {
            a.fill(StereoFrame::SILENCE);
            b.fill(StereoFrame::SILENCE);
        })
        .unwrap();
    engine.start().unwrap();

    // A 12 sample lead-in, then one period per packet. With a 16 slot ring
    // every other packet straddles the wrap.
    let samples: Vec<i16> = (1..=36).collect();
    let mut delivered = [&samples[..12], &samples[12..20], &samples[20..28], &samples[28..]].into_iter();

    for _ in 0..6 {
        if let Some(packet) = delivered.next() {
            writer.write(&le_bytes(packet.iter().copied()));
        }
        bus.borrow_mut().tick();
        let mut completion = engine.on_interrupt().expect("half completed");
        feeder.fill(completion.buffer(), Gain::UNITY);
    }
    bus.borrow_mut().tick();
    bus.borrow_mut().tick();

    let clocked_out = bus.borrow().clocked_out.clone();
    // Two primed silent halves, then the refills in order.
    let audio = &clocked_out[2 * FRAMES..];
    let expected: Vec<StereoFrame> = samples
        .iter()
        .map(|&s| StereoFrame::from_mono(s))
        .chain(std::iter::repeat(StereoFrame::SILENCE))
        .take(audio.len())
        .collect();

    assert_eq!(audio.len(), 6 * FRAMES);
    assert_eq!(audio, expected.as_slice());
    assert!(clocked_out[..2 * FRAMES].iter().all(|frame| *frame == StereoFrame::SILENCE));
    assert!(counters.is_starving());
    assert_eq!(engine.desyncs(), 0);
}

#[test]
fn muted_stream_keeps_draining_the_ring() {
    let counters = PipelineCounters::new();
    let mut ring = RingBuffer::<i16, 16>::new();
    let (producer, consumer) = ring.split();
    let mut writer = InboundStreamWriter::new(producer);
    let mut feeder = OutputSampleFeeder::new(consumer, &counters);

    writer.write(&le_bytes(0..FRAMES as i16));
    let mut out = [StereoFrame { left: 1, right: 1 }; FRAMES];
    let report = feeder.fill(&mut out, Gain::from_controls(true, 0));

    assert_eq!(report.real, FRAMES);
    assert_eq!(out, [StereoFrame::SILENCE; FRAMES]);
    assert_eq!(writer.fill_level(), 0);
}
