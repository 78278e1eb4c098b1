use crate::entity::{REQUEST_CUR, REQUEST_RANGE};
use crate::error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Cur,
    Range,
}

impl TryFrom<u8> for RequestKind {
    type Error = ControlError;

    fn try_from(b_request: u8) -> Result<Self, Self::Error> {
        match b_request {
            REQUEST_CUR => Ok(RequestKind::Cur),
            REQUEST_RANGE => Ok(RequestKind::Range),
            _ => Err(ControlError::Unsupported),
        }
    }
}

/// A class-specific request addressed to an entity of the audio function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRequest {
    pub kind: RequestKind,
    pub entity: u8,
    pub selector: u8,
    pub channel: u8,
    pub interface: u8,
}

impl ControlRequest {
    /// Decodes the setup packet fields: `wValue` is selector then channel,
    /// `wIndex` is entity then interface, high byte first.
    pub fn decode(b_request: u8, w_value: u16, w_index: u16) -> Result<Self, ControlError> {
        let [channel, selector] = w_value.to_le_bytes();
        let [interface, entity] = w_index.to_le_bytes();

        Ok(Self {
            kind: RequestKind::try_from(b_request)?,
            entity,
            selector,
            channel,
            interface,
        })
    }

    pub const fn cur(entity: u8, selector: u8, channel: u8) -> Self {
        Self {
            kind: RequestKind::Cur,
            entity,
            selector,
            channel,
            interface: 0,
        }
    }

    pub const fn range(entity: u8, selector: u8, channel: u8) -> Self {
        Self {
            kind: RequestKind::Range,
            entity,
            selector,
            channel,
            interface: 0,
        }
    }
}
