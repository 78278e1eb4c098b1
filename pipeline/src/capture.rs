use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::zerocopy_channel;

use crate::counters::PipelineCounters;
use crate::sample::{MonoSample, adc_to_pcm};

/// Non-blocking hand-off of captured blocks to whatever ships them to the
/// host.
pub trait OutboundTransport {
    /// A free block to write into, or `None` if the transport is backed up.
    fn try_reserve(&mut self) -> Option<&mut [MonoSample]>;

    /// Queues the block returned by the last successful `try_reserve`.
    fn commit(&mut self);
}

impl<M: RawMutex, const N: usize> OutboundTransport for zerocopy_channel::Sender<'_, M, [MonoSample; N]> {
    fn try_reserve(&mut self) -> Option<&mut [MonoSample]> {
        self.try_send().map(|block| block.as_mut_slice())
    }

    fn commit(&mut self) {
        self.send_done();
    }
}

/// Drains finished capture buffers into the outbound transport.
///
/// There is no backpressure: if the transport has no free block, the
/// captured buffer is dropped and counted.
pub struct InputSampleCapture<'c, T: OutboundTransport> {
    transport: T,
    counters: &'c PipelineCounters,
}

impl<'c, T: OutboundTransport> InputSampleCapture<'c, T> {
    pub fn new(transport: T, counters: &'c PipelineCounters) -> Self {
        Self { transport, counters }
    }

    /// Handles one completed capture half. Returns whether the block was
    /// delivered.
    pub fn on_completion(&mut self, raw: &[u16]) -> bool {
        let Some(block) = self.transport.try_reserve() else {
            self.counters.record_capture(false);
            trace!("Capture: transport full, dropping {} samples", raw.len());
            return false;
        };

        let converted = raw.len().min(block.len());
        let (head, tail) = block.split_at_mut(converted);
        for (pcm, &reading) in head.iter_mut().zip(raw) {
            *pcm = adc_to_pcm(reading);
        }
        tail.fill(0);

        self.transport.commit();
        self.counters.record_capture(true);
        true
    }
}
