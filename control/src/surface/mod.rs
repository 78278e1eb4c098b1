//! Host-facing side of the control state: answers GET-CUR, GET-RANGE and
//! SET-CUR requests with the little-endian payload layouts of USB Audio 2.0.
//!
//! | entity          | selector    | CUR              | RANGE            |
//! |-----------------|-------------|------------------|------------------|
//! | clock source    | sample rate | 4 bytes, get/set | layout 3, get    |
//! | clock source    | clock valid | 1 byte, get      |                  |
//! | feature unit    | mute        | 1 byte, get/set  |                  |
//! | feature unit    | volume      | 2 bytes, get/set | layout 2, get    |
//! | input terminals | connector   | cluster, get     |                  |

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::entity::*;
use crate::error::ControlError;
use crate::request::{ControlRequest, RequestKind};
use crate::state::AudioControlState;
use crate::{SUPPORTED_SAMPLE_RATES, VOLUME_MAX, VOLUME_MIN, VOLUME_RESOLUTION};

const RANGE_LAYOUT_3_LEN: usize = 2 + 12 * SUPPORTED_SAMPLE_RATES.len();
const MAX_PAYLOAD: usize = if RANGE_LAYOUT_3_LEN > 8 { RANGE_LAYOUT_3_LEN } else { 8 };

pub struct AudioControlSurface<'s, M: RawMutex> {
    state: &'s AudioControlState<M>,
}

impl<'s, M: RawMutex> AudioControlSurface<'s, M> {
    pub fn new(state: &'s AudioControlState<M>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &'s AudioControlState<M> {
        self.state
    }

    /// Writes the response payload into `buf` and returns its length.
    pub fn get(&self, request: &ControlRequest, buf: &mut [u8]) -> Result<usize, ControlError> {
        let payload = self.get_payload(request)?;
        trace!(
            "Control: GET {} entity {} selector {} channel {}",
            request.kind,
            request.entity,
            request.selector,
            request.channel
        );
        payload.write_to(buf)
    }

    /// Applies a SET-CUR request. The payload length is checked before
    /// anything is changed.
    pub fn set(&self, request: &ControlRequest, data: &[u8]) -> Result<(), ControlError> {
        if request.kind != RequestKind::Cur {
            return Err(ControlError::Unsupported);
        }

        match (request.entity, request.selector) {
            (CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL) => {
                let rate = u32::from_le_bytes(exact(data)?);
                clock_channel(request)?;
                self.state.set_sample_rate(rate)
            }
            (FEATURE_UNIT_ID, FU_MUTE_CONTROL) => {
                let [muted] = exact(data)?;
                self.state.set_mute(request.channel, muted != 0)
            }
            (FEATURE_UNIT_ID, FU_VOLUME_CONTROL) => {
                let volume = i16::from_le_bytes(exact(data)?);
                self.state.set_volume(request.channel, volume)
            }
            _ => Err(ControlError::Unsupported),
        }
    }

    fn get_payload(&self, request: &ControlRequest) -> Result<Payload, ControlError> {
        let mut payload = Payload::new();

        match (request.entity, request.selector, request.kind) {
            (CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, RequestKind::Cur) => {
                clock_channel(request)?;
                payload.push(&self.state.sample_rate().to_le_bytes());
            }
            (CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, RequestKind::Range) => {
                clock_channel(request)?;
                payload.push(&(SUPPORTED_SAMPLE_RATES.len() as u16).to_le_bytes());
                for rate in SUPPORTED_SAMPLE_RATES {
                    payload.push(&rate.to_le_bytes());
                    payload.push(&rate.to_le_bytes());
                    payload.push(&0u32.to_le_bytes());
                }
            }
            (CLOCK_SOURCE_ID, CS_CLOCK_VALID_CONTROL, RequestKind::Cur) => {
                clock_channel(request)?;
                payload.push(&[u8::from(self.state.clock_valid())]);
            }
            (FEATURE_UNIT_ID, FU_MUTE_CONTROL, RequestKind::Cur) => {
                payload.push(&[u8::from(self.state.mute(request.channel)?)]);
            }
            (FEATURE_UNIT_ID, FU_VOLUME_CONTROL, RequestKind::Cur) => {
                payload.push(&self.state.volume(request.channel)?.to_le_bytes());
            }
            (FEATURE_UNIT_ID, FU_VOLUME_CONTROL, RequestKind::Range) => {
                // Validates the channel even though the range is shared.
                self.state.volume(request.channel)?;
                payload.push(&1u16.to_le_bytes());
                payload.push(&VOLUME_MIN.to_le_bytes());
                payload.push(&VOLUME_MAX.to_le_bytes());
                payload.push(&VOLUME_RESOLUTION.to_le_bytes());
            }
            (SPEAKER_INPUT_TERMINAL_ID | MIC_INPUT_TERMINAL_ID, TE_CONNECTOR_CONTROL, RequestKind::Cur) => {
                // Channel cluster: bNrChannels, bmChannelConfig, iChannelNames.
                payload.push(&[STREAM_CHANNELS]);
                payload.push(&0u32.to_le_bytes());
                payload.push(&[0]);
            }
            _ => return Err(ControlError::Unsupported),
        }

        Ok(payload)
    }
}

/// Clock source controls only exist on the master channel.
fn clock_channel(request: &ControlRequest) -> Result<(), ControlError> {
    match request.channel {
        0 => Ok(()),
        channel => Err(ControlError::InvalidChannel(channel)),
    }
}

fn exact<const L: usize>(data: &[u8]) -> Result<[u8; L], ControlError> {
    data.try_into().map_err(|_| ControlError::InvalidLength {
        expected: L,
        actual: data.len(),
    })
}

struct Payload {
    bytes: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Payload {
    fn new() -> Self {
        Self {
            bytes: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        let end = self.len + bytes.len();
        if let Some(dest) = self.bytes.get_mut(self.len..end) {
            dest.copy_from_slice(bytes);
            self.len = end;
        }
    }

    fn write_to(&self, buf: &mut [u8]) -> Result<usize, ControlError> {
        let available = buf.len();
        let dest = buf.get_mut(..self.len).ok_or(ControlError::BufferTooSmall {
            needed: self.len,
            available,
        })?;
        dest.copy_from_slice(&self.bytes[..self.len]);
        Ok(self.len)
    }
}

#[cfg(test)]
mod test;
