use crate::counters::PipelineCounters;
use crate::ring_buffer::RingConsumer;
use crate::sample::{Gain, MonoSample, StereoFrame};

/// Where the output feeder pulls mono samples from.
pub trait SampleSource {
    /// Samples that can be taken right now without reading stale data.
    fn available(&self) -> usize;

    fn next_sample(&mut self) -> MonoSample;
}

impl<const N: usize> SampleSource for RingConsumer<'_, MonoSample, N> {
    fn available(&self) -> usize {
        self.length()
    }

    fn next_sample(&mut self) -> MonoSample {
        self.read_one()
    }
}

/// A static clip played in a loop.
pub struct StaticAsset<'a> {
    samples: &'a [MonoSample],
    position: usize,
}

impl<'a> StaticAsset<'a> {
    pub const fn new(samples: &'a [MonoSample]) -> Self {
        Self {
            samples,
            position: 0,
        }
    }
}

impl SampleSource for StaticAsset<'_> {
    fn available(&self) -> usize {
        if self.samples.is_empty() { 0 } else { usize::MAX }
    }

    fn next_sample(&mut self) -> MonoSample {
        let Some(&sample) = self.samples.get(self.position) else {
            return 0;
        };
        self.position = (self.position + 1) % self.samples.len();
        sample
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FillReport {
    /// Frames converted from source samples.
    pub real: usize,
    /// Frames padded with silence because the source ran dry.
    pub silent: usize,
}

/// Refills output buffers from a sample source on every DMA completion.
///
/// Runs in interrupt context: it never blocks and always fills the whole
/// buffer, padding with silence when the source is starved.
pub struct OutputSampleFeeder<'c, S: SampleSource> {
    source: S,
    counters: &'c PipelineCounters,
}

impl<'c, S: SampleSource> OutputSampleFeeder<'c, S> {
    pub fn new(source: S, counters: &'c PipelineCounters) -> Self {
        Self { source, counters }
    }

    pub fn fill(&mut self, out: &mut [StereoFrame], gain: Gain) -> FillReport {
        let real = self.source.available().min(out.len());
        let (converted, padding) = out.split_at_mut(real);

        // Muted samples are still consumed so the ring keeps draining.
        for frame in converted {
            *frame = gain.apply(self.source.next_sample());
        }
        padding.fill(StereoFrame::SILENCE);

        let silent = padding.len();
        let starved = silent > 0;
        self.counters.record_fill(starved);
        if self.counters.set_starving(starved) {
            if starved {
                debug!("Feeder: starved, padding {} of {} frames", silent, real + silent);
            } else {
                debug!("Feeder: recovered from starvation");
            }
        }

        FillReport { real, silent }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
