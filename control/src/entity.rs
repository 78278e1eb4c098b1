//! Identifiers of the audio function topology and the USB Audio 2.0 codes
//! used to address its controls.
//!
//! Speaker: input terminal (USB streaming) -> feature unit -> output terminal.
//! Microphone: input terminal -> output terminal (USB streaming).
//! Both share one clock source.

pub const SPEAKER_INPUT_TERMINAL_ID: u8 = 0x01;
pub const FEATURE_UNIT_ID: u8 = 0x02;
pub const SPEAKER_OUTPUT_TERMINAL_ID: u8 = 0x03;
pub const CLOCK_SOURCE_ID: u8 = 0x04;
pub const MIC_INPUT_TERMINAL_ID: u8 = 0x11;
pub const MIC_OUTPUT_TERMINAL_ID: u8 = 0x13;

// bRequest
pub const REQUEST_CUR: u8 = 0x01;
pub const REQUEST_RANGE: u8 = 0x02;

// Clock source control selectors
pub const CS_SAM_FREQ_CONTROL: u8 = 0x01;
pub const CS_CLOCK_VALID_CONTROL: u8 = 0x02;

// Feature unit control selectors
pub const FU_MUTE_CONTROL: u8 = 0x01;
pub const FU_VOLUME_CONTROL: u8 = 0x02;

// Terminal control selectors
pub const TE_CONNECTOR_CONTROL: u8 = 0x02;

/// Logical channels on the feature unit: 0 is the master channel, 1 the
/// single mono channel.
pub const CHANNEL_COUNT: usize = 2;

/// Channels carried by each streaming interface.
pub const STREAM_CHANNELS: u8 = 1;
