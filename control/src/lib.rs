#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod entity;
mod error;
pub mod feedback;
mod request;
mod state;
mod surface;

pub use error::ControlError;
pub use feedback::{FeedbackCalculator, FeedbackFormat, FeedbackValue};
pub use request::{ControlRequest, RequestKind};
pub use state::{AudioControlState, ControlChange};
pub use surface::AudioControlSurface;

/// The clock source runs at a single rate.
pub const SUPPORTED_SAMPLE_RATES: [u32; 1] = [audio_pipeline::SAMPLE_RATE_HZ];

// Volume range in 1/256 dB: -50 dB to 0 dB in 1 dB steps.
pub const VOLUME_MIN: i16 = -50 * 256;
pub const VOLUME_MAX: i16 = 0;
pub const VOLUME_RESOLUTION: i16 = 256;
