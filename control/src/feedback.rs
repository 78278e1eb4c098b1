//! Isochronous feedback for the asynchronous OUT endpoint.
//!
//! The device reports how many samples it consumes per (micro)frame. The
//! nominal value comes from the current sample rate; it is nudged by the ring
//! fill level so the host sends a little more when the ring runs low and a
//! little less when it runs high. The correction is proportional to the
//! distance from half full and never exceeds one sample per frame.

use fixed::types::{I32F32, U16F16, U18F14};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackFormat {
    /// 10.14 samples per 1 ms frame, sent as 3 bytes.
    FullSpeed,
    /// 16.16 samples per 125 µs microframe, sent as 4 bytes.
    HighSpeed,
}

impl FeedbackFormat {
    const fn frames_per_second(self) -> u32 {
        match self {
            FeedbackFormat::FullSpeed => 1000,
            FeedbackFormat::HighSpeed => 8000,
        }
    }

    pub const fn len(self) -> usize {
        match self {
            FeedbackFormat::FullSpeed => 3,
            FeedbackFormat::HighSpeed => 4,
        }
    }
}

/// An encoded feedback value ready for the feedback endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackValue {
    bytes: [u8; 4],
    len: usize,
}

impl FeedbackValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

pub struct FeedbackCalculator {
    format: FeedbackFormat,
}

impl FeedbackCalculator {
    pub const fn new(format: FeedbackFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> FeedbackFormat {
        self.format
    }

    /// Samples per (micro)frame the host should send next.
    pub fn samples_per_frame(&self, sample_rate: u32, fill_level: usize, capacity: usize) -> I32F32 {
        let frames = I32F32::from_num(self.format.frames_per_second());
        let nominal = I32F32::from_num(sample_rate) / frames;

        let half = I32F32::from_num(capacity / 2);
        if half == I32F32::ZERO {
            return nominal;
        }

        let fill = I32F32::from_num(fill_level.min(capacity));
        let correction = ((half - fill) / half).clamp(-I32F32::ONE, I32F32::ONE);
        // One sample per millisecond, spread over the microframes.
        let per_frame = correction / I32F32::from_num(self.format.frames_per_second() / 1000);

        (nominal + per_frame).max(I32F32::ZERO)
    }

    pub fn value(&self, sample_rate: u32, fill_level: usize, capacity: usize) -> FeedbackValue {
        let samples = self.samples_per_frame(sample_rate, fill_level, capacity);

        let mut bytes = [0; 4];
        match self.format {
            FeedbackFormat::FullSpeed => {
                let encoded = U18F14::saturating_from_num(samples).to_bits().min(0x00FF_FFFF);
                bytes.copy_from_slice(&encoded.to_le_bytes());
            }
            FeedbackFormat::HighSpeed => {
                bytes = U16F16::saturating_from_num(samples).to_bits().to_le_bytes();
            }
        }

        FeedbackValue {
            bytes,
            len: self.format.len(),
        }
    }
}
