use core::sync::atomic::{AtomicBool, AtomicI16, AtomicU32, Ordering};

use audio_pipeline::Gain;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use crate::entity::CHANNEL_COUNT;
use crate::error::ControlError;
use crate::{SUPPORTED_SAMPLE_RATES, VOLUME_MAX, VOLUME_MIN};

/// The most recent change applied to the control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlChange {
    Mute { channel: u8, muted: bool },
    Volume { channel: u8, volume: i16 },
    SampleRate(u32),
    ClockValid(bool),
    Reset,
}

/// Mute, volume and clock state of the audio function.
///
/// Written from the control-request and console contexts, read from the DAC
/// feed interrupt. Fields are independent atomics: a reader may see a value
/// one buffer period old, which is inaudible.
pub struct AudioControlState<M: RawMutex> {
    mute: [AtomicBool; CHANNEL_COUNT],
    volume: [AtomicI16; CHANNEL_COUNT],
    sample_rate: AtomicU32,
    clock_valid: AtomicBool,
    changes: Signal<M, ControlChange>,
}

impl<M: RawMutex> AudioControlState<M> {
    pub const fn new() -> Self {
        Self {
            mute: [const { AtomicBool::new(false) }; CHANNEL_COUNT],
            volume: [const { AtomicI16::new(0) }; CHANNEL_COUNT],
            sample_rate: AtomicU32::new(SUPPORTED_SAMPLE_RATES[0]),
            clock_valid: AtomicBool::new(false),
            changes: Signal::new(),
        }
    }

    pub fn mute(&self, channel: u8) -> Result<bool, ControlError> {
        Ok(self.mute[channel_index(channel)?].load(Ordering::Relaxed))
    }

    pub fn volume(&self, channel: u8) -> Result<i16, ControlError> {
        Ok(self.volume[channel_index(channel)?].load(Ordering::Relaxed))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn clock_valid(&self) -> bool {
        self.clock_valid.load(Ordering::Relaxed)
    }

    /// Setting the current value again is accepted and still notifies.
    pub fn set_mute(&self, channel: u8, muted: bool) -> Result<(), ControlError> {
        self.mute[channel_index(channel)?].store(muted, Ordering::Relaxed);
        debug!("Control: channel {} mute {}", channel, muted);
        self.changes.signal(ControlChange::Mute { channel, muted });
        Ok(())
    }

    /// `volume` is in 1/256 dB and must lie within the advertised range.
    pub fn set_volume(&self, channel: u8, volume: i16) -> Result<(), ControlError> {
        let index = channel_index(channel)?;
        if !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
            return Err(ControlError::OutOfRange);
        }

        self.volume[index].store(volume, Ordering::Relaxed);
        debug!("Control: channel {} volume {}", channel, volume);
        self.changes.signal(ControlChange::Volume { channel, volume });
        Ok(())
    }

    pub fn set_sample_rate(&self, rate: u32) -> Result<(), ControlError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&rate) {
            return Err(ControlError::UnsupportedRate(rate));
        }

        self.sample_rate.store(rate, Ordering::Relaxed);
        info!("Control: sample rate {} Hz", rate);
        self.changes.signal(ControlChange::SampleRate(rate));
        Ok(())
    }

    /// Marked by the firmware once the output chain is running.
    pub fn set_clock_valid(&self, valid: bool) {
        self.clock_valid.store(valid, Ordering::Relaxed);
        self.changes.signal(ControlChange::ClockValid(valid));
    }

    /// Back to power-on mute, volume and rate, as after a bus reset. Clock
    /// validity belongs to the pipeline and is kept.
    pub fn reset(&self) {
        for (mute, volume) in self.mute.iter().zip(&self.volume) {
            mute.store(false, Ordering::Relaxed);
            volume.store(0, Ordering::Relaxed);
        }
        self.sample_rate.store(SUPPORTED_SAMPLE_RATES[0], Ordering::Relaxed);
        self.changes.signal(ControlChange::Reset);
    }

    /// Output gain for the mono stream: the master channel and channel 1
    /// combined.
    pub fn gain(&self) -> Gain {
        let muted = self.mute.iter().any(|mute| mute.load(Ordering::Relaxed));
        let volume = self
            .volume
            .iter()
            .fold(0i16, |sum, volume| sum.saturating_add(volume.load(Ordering::Relaxed)));

        Gain::from_controls(muted, volume)
    }

    /// Waits for the next change. Only the latest one is kept.
    pub async fn changed(&self) -> ControlChange {
        self.changes.wait().await
    }

    pub fn try_take_change(&self) -> Option<ControlChange> {
        self.changes.try_take()
    }
}

impl<M: RawMutex> Default for AudioControlState<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn channel_index(channel: u8) -> Result<usize, ControlError> {
    let index = channel as usize;
    if index < CHANNEL_COUNT {
        Ok(index)
    } else {
        Err(ControlError::InvalidChannel(channel))
    }
}
