use core::fmt;

/// Why a control request was refused. The USB layer answers every variant
/// with a STALL; nothing is written back and no state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The (entity, selector, request) combination is not implemented.
    Unsupported,
    /// A SET payload whose length does not match the control's layout.
    InvalidLength { expected: usize, actual: usize },
    InvalidChannel(u8),
    UnsupportedRate(u32),
    /// The GET response does not fit the buffer provided by the USB stack.
    BufferTooSmall { needed: usize, available: usize },
    /// A value outside the range the control advertises.
    OutOfRange,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Unsupported => f.write_str("unsupported control request"),
            ControlError::InvalidLength { expected, actual } => {
                write!(f, "payload is {actual} bytes, control expects {expected}")
            }
            ControlError::InvalidChannel(channel) => write!(f, "no channel {channel}"),
            ControlError::UnsupportedRate(rate) => write!(f, "sample rate {rate} Hz not supported"),
            ControlError::BufferTooSmall { needed, available } => {
                write!(f, "response needs {needed} bytes, buffer holds {available}")
            }
            ControlError::OutOfRange => f.write_str("value out of range"),
        }
    }
}

impl core::error::Error for ControlError {}
