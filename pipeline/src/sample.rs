use bytemuck::{Pod, Zeroable};

/// Sample as carried on both USB audio streams: signed 16 bit, mono.
pub type MonoSample = i16;

/// Left shift that maps 16-bit full scale onto a 32-bit serial slot.
pub const WIDEN_SHIFT: u32 = 16;

/// Mid-scale reading of the 12-bit ADC.
pub const ADC_MIDSCALE: u16 = 2048;

/// One frame as clocked out on the serial audio bus: left slot, then right slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StereoFrame {
    pub left: i32,
    pub right: i32,
}

impl StereoFrame {
    pub const SILENCE: Self = Self { left: 0, right: 0 };

    /// Duplicates a mono sample onto both slots at full protocol width.
    pub const fn from_mono(sample: MonoSample) -> Self {
        Self::from_mono_shifted(sample, WIDEN_SHIFT)
    }

    pub const fn from_mono_shifted(sample: MonoSample, shift: u32) -> Self {
        let wide = (sample as i32) << shift;
        Self {
            left: wide,
            right: wide,
        }
    }
}

impl From<MonoSample> for StereoFrame {
    fn from(sample: MonoSample) -> Self {
        Self::from_mono(sample)
    }
}

/// Output level derived from the feature unit's mute and volume controls.
///
/// Volume is applied as a reduced widening shift: every -6 dB drops one bit,
/// which halves the amplitude. This is a coarse approximation of a real
/// logarithmic gain, but it keeps the interrupt path to a single shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gain {
    shift: Option<u32>,
}

impl Gain {
    pub const UNITY: Self = Self {
        shift: Some(WIDEN_SHIFT),
    };
    pub const MUTED: Self = Self { shift: None };

    /// `volume_8q8` is in 1/256 dB units, as used by USB Audio volume controls.
    pub const fn from_controls(muted: bool, volume_8q8: i16) -> Self {
        if muted {
            return Self::MUTED;
        }

        let db = volume_8q8 / 256;
        let attenuation = if db >= 0 { 0 } else { (-(db as i32) / 6) as u32 };

        if attenuation > WIDEN_SHIFT {
            Self::MUTED
        } else {
            Self {
                shift: Some(WIDEN_SHIFT - attenuation),
            }
        }
    }

    pub const fn is_muted(self) -> bool {
        self.shift.is_none()
    }

    #[inline]
    pub const fn apply(self, sample: MonoSample) -> StereoFrame {
        match self.shift {
            Some(shift) => StereoFrame::from_mono_shifted(sample, shift),
            None => StereoFrame::SILENCE,
        }
    }
}

/// Re-centres a 12-bit unsigned ADC reading into signed 16-bit PCM.
#[inline]
pub const fn adc_to_pcm(raw: u16) -> MonoSample {
    let centred = (raw & 0x0FFF) as i16 - ADC_MIDSCALE as i16;
    centred << 4
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mono_is_duplicated_and_widened_to_full_scale() {
        assert_eq!(
            StereoFrame::from_mono(i16::MAX),
            StereoFrame {
                left: 0x7FFF_0000,
                right: 0x7FFF_0000
            }
        );
        assert_eq!(StereoFrame::from_mono(i16::MIN).left, i32::MIN);
        assert_eq!(StereoFrame::from_mono(-1).right, -65536);
        assert_eq!(StereoFrame::from_mono(0), StereoFrame::SILENCE);
    }

    #[test]
    fn frame_layout_is_interleaved_left_then_right() {
        let frame = StereoFrame { left: 1, right: 2 };
        let words: &[i32; 2] = bytemuck::cast_ref(&frame);
        assert_eq!(words, &[1, 2]);
    }

    #[test]
    fn gain_drops_one_bit_every_six_db() {
        assert_eq!(Gain::from_controls(false, 0), Gain::UNITY);
        assert_eq!(Gain::from_controls(false, 3 * 256), Gain::UNITY);
        assert_eq!(Gain::from_controls(false, -5 * 256).apply(1).left, 1 << 16);
        assert_eq!(Gain::from_controls(false, -6 * 256).apply(1).left, 1 << 15);
        assert_eq!(Gain::from_controls(false, -50 * 256).apply(1).left, 1 << 8);
    }

    #[test]
    fn gain_is_silent_when_muted_or_fully_attenuated() {
        assert!(Gain::from_controls(true, 0).is_muted());
        assert_eq!(Gain::MUTED.apply(i16::MAX), StereoFrame::SILENCE);
        assert!(Gain::from_controls(false, i16::MIN).is_muted());
    }

    #[test]
    fn adc_readings_are_centred_around_midscale() {
        assert_eq!(adc_to_pcm(ADC_MIDSCALE), 0);
        assert_eq!(adc_to_pcm(0), i16::MIN);
        assert_eq!(adc_to_pcm(0x0FFF), 2047 << 4);
        // Bits above the 12-bit result are ignored.
        assert_eq!(adc_to_pcm(0xF800), 0);
    }
}
