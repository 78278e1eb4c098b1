use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Event counters shared between the interrupt-side pipeline and the
/// foreground loop. Each counter has a single writer context.
pub struct PipelineCounters {
    filled_buffers: AtomicU32,
    starved_buffers: AtomicU32,
    starvation_events: AtomicU32,
    starving: AtomicBool,
    captured_buffers: AtomicU32,
    dropped_buffers: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CounterSnapshot {
    pub filled_buffers: u32,
    pub starved_buffers: u32,
    pub starvation_events: u32,
    pub starving: bool,
    pub captured_buffers: u32,
    pub dropped_buffers: u32,
}

impl PipelineCounters {
    pub const fn new() -> Self {
        Self {
            filled_buffers: AtomicU32::new(0),
            starved_buffers: AtomicU32::new(0),
            starvation_events: AtomicU32::new(0),
            starving: AtomicBool::new(false),
            captured_buffers: AtomicU32::new(0),
            dropped_buffers: AtomicU32::new(0),
        }
    }

    /// Whether the last output buffer had to be padded with silence.
    pub fn is_starving(&self) -> bool {
        self.starving.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            filled_buffers: self.filled_buffers.load(Ordering::Relaxed),
            starved_buffers: self.starved_buffers.load(Ordering::Relaxed),
            starvation_events: self.starvation_events.load(Ordering::Relaxed),
            starving: self.starving.load(Ordering::Relaxed),
            captured_buffers: self.captured_buffers.load(Ordering::Relaxed),
            dropped_buffers: self.dropped_buffers.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_fill(&self, starved: bool) {
        bump(&self.filled_buffers);
        if starved {
            bump(&self.starved_buffers);
        }
    }

    /// Returns `true` when this call changed the starvation state.
    pub(crate) fn set_starving(&self, starving: bool) -> bool {
        let was = self.starving.load(Ordering::Relaxed);
        self.starving.store(starving, Ordering::Relaxed);
        if starving && !was {
            bump(&self.starvation_events);
        }
        was != starving
    }

    pub(crate) fn record_capture(&self, delivered: bool) {
        if delivered {
            bump(&self.captured_buffers);
        } else {
            bump(&self.dropped_buffers);
        }
    }
}

impl Default for PipelineCounters {
    fn default() -> Self {
        Self::new()
    }
}

// Single writer per counter, so a load/store pair is enough and also works on
// cores without atomic read-modify-write.
fn bump(counter: &AtomicU32) {
    counter.store(counter.load(Ordering::Relaxed).wrapping_add(1), Ordering::Relaxed);
}
