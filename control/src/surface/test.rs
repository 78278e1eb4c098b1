use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::state::ControlChange;

macro_rules! setup_surface {
    ($state:ident, $surface:ident) => {
        let $state = AudioControlState::<NoopRawMutex>::new();
        let $surface = AudioControlSurface::new(&$state);
    };
}

fn get(surface: &AudioControlSurface<'_, NoopRawMutex>, request: ControlRequest) -> Result<Vec<u8>, ControlError> {
    let mut buf = [0xAA; 64];
    let len = surface.get(&request, &mut buf)?;
    Ok(buf[..len].to_vec())
}

#[test]
fn setting_mute_twice_is_idempotent() {
    setup_surface!(state, surface);
    let mute = ControlRequest::cur(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 1);

    assert_eq!(surface.set(&mute, &[1]), Ok(()));
    assert_eq!(surface.set(&mute, &[1]), Ok(()));

    assert_eq!(state.mute(1), Ok(true));
    assert_eq!(get(&surface, mute), Ok(vec![1]));
    assert!(state.gain().is_muted());
}

#[test]
fn get_reflects_the_last_accepted_volume() {
    setup_surface!(state, surface);
    let volume = ControlRequest::cur(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 0);

    surface.set(&volume, &(-12 * 256i16).to_le_bytes()).unwrap();
    surface.set(&volume, &(-3 * 256i16).to_le_bytes()).unwrap();

    assert_eq!(get(&surface, volume), Ok((-3 * 256i16).to_le_bytes().to_vec()));
    assert_eq!(state.volume(0), Ok(-768));
}

#[test]
fn volume_outside_the_range_is_rejected_unchanged() {
    setup_surface!(state, surface);
    let volume = ControlRequest::cur(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 1);
    surface.set(&volume, &(-256i16).to_le_bytes()).unwrap();

    assert_eq!(surface.set(&volume, &256i16.to_le_bytes()), Err(ControlError::OutOfRange));
    assert_eq!(surface.set(&volume, &i16::MIN.to_le_bytes()), Err(ControlError::OutOfRange));
    assert_eq!(state.volume(1), Ok(-256));
}

#[test]
fn unsupported_sample_rate_leaves_the_current_rate() {
    setup_surface!(state, surface);
    let rate = ControlRequest::cur(CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, 0);

    assert_eq!(
        surface.set(&rate, &44_100u32.to_le_bytes()),
        Err(ControlError::UnsupportedRate(44_100))
    );
    assert_eq!(state.sample_rate(), 48_000);
    assert_eq!(get(&surface, rate), Ok(48_000u32.to_le_bytes().to_vec()));

    assert_eq!(surface.set(&rate, &48_000u32.to_le_bytes()), Ok(()));
}

#[test]
fn malformed_lengths_are_rejected_before_any_change() {
    setup_surface!(state, surface);

    assert_eq!(
        surface.set(&ControlRequest::cur(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 0), &[1, 0]),
        Err(ControlError::InvalidLength {
            expected: 1,
            actual: 2
        })
    );
    assert_eq!(
        surface.set(&ControlRequest::cur(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 0), &[0x00]),
        Err(ControlError::InvalidLength {
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(
        surface.set(&ControlRequest::cur(CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, 0), &[0x44, 0xAC, 0x00]),
        Err(ControlError::InvalidLength {
            expected: 4,
            actual: 3
        })
    );

    assert_eq!(state.mute(0), Ok(false));
    assert_eq!(state.volume(0), Ok(0));
    assert_eq!(state.sample_rate(), 48_000);
    assert_eq!(state.try_take_change(), None);
}

#[test]
fn unknown_entities_and_selectors_are_unsupported() {
    setup_surface!(state, surface);

    for request in [
        ControlRequest::cur(SPEAKER_OUTPUT_TERMINAL_ID, TE_CONNECTOR_CONTROL, 0),
        ControlRequest::cur(0x7F, FU_MUTE_CONTROL, 0),
        ControlRequest::cur(FEATURE_UNIT_ID, 0x0B, 0),
        ControlRequest::range(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 0),
        ControlRequest::range(CLOCK_SOURCE_ID, CS_CLOCK_VALID_CONTROL, 0),
    ] {
        assert_eq!(get(&surface, request), Err(ControlError::Unsupported), "{request:?}");
    }

    assert_eq!(
        surface.set(&ControlRequest::range(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 0), &[0; 8]),
        Err(ControlError::Unsupported)
    );
    assert_eq!(
        surface.set(&ControlRequest::cur(CLOCK_SOURCE_ID, CS_CLOCK_VALID_CONTROL, 0), &[1]),
        Err(ControlError::Unsupported)
    );
    assert!(!state.clock_valid());
}

#[test]
fn channels_past_the_mono_channel_are_rejected() {
    setup_surface!(state, surface);

    assert_eq!(
        surface.set(&ControlRequest::cur(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 2), &[1]),
        Err(ControlError::InvalidChannel(2))
    );
    assert_eq!(
        get(&surface, ControlRequest::cur(CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, 1)),
        Err(ControlError::InvalidChannel(1))
    );
    assert_eq!(state.mute(2), Err(ControlError::InvalidChannel(2)));
}

#[test]
fn volume_range_uses_layout_two() {
    setup_surface!(_state, surface);

    assert_eq!(
        get(&surface, ControlRequest::range(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 0)),
        Ok(vec![0x01, 0x00, 0x00, 0xCE, 0x00, 0x00, 0x00, 0x01])
    );
}

#[test]
fn sample_rate_range_is_a_single_degenerate_subrange() {
    setup_surface!(_state, surface);

    assert_eq!(
        get(&surface, ControlRequest::range(CLOCK_SOURCE_ID, CS_SAM_FREQ_CONTROL, 0)),
        Ok(vec![
            0x01, 0x00, // wNumSubRanges
            0x80, 0xBB, 0x00, 0x00, // min
            0x80, 0xBB, 0x00, 0x00, // max
            0x00, 0x00, 0x00, 0x00, // res
        ])
    );
}

#[test]
fn clock_is_reported_valid_once_the_pipeline_runs() {
    setup_surface!(state, surface);
    let valid = ControlRequest::cur(CLOCK_SOURCE_ID, CS_CLOCK_VALID_CONTROL, 0);

    assert_eq!(get(&surface, valid), Ok(vec![0]));
    state.set_clock_valid(true);
    assert_eq!(get(&surface, valid), Ok(vec![1]));
}

#[test]
fn input_terminals_report_a_mono_cluster() {
    setup_surface!(_state, surface);

    for terminal in [SPEAKER_INPUT_TERMINAL_ID, MIC_INPUT_TERMINAL_ID] {
        assert_eq!(
            get(&surface, ControlRequest::cur(terminal, TE_CONNECTOR_CONTROL, 0)),
            Ok(vec![1, 0, 0, 0, 0, 0])
        );
    }
}

#[test]
fn short_response_buffer_is_reported() {
    setup_surface!(_state, surface);
    let mut buf = [0; 4];

    assert_eq!(
        surface.get(&ControlRequest::range(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 0), &mut buf),
        Err(ControlError::BufferTooSmall {
            needed: 8,
            available: 4
        })
    );
}

#[test]
fn accepted_changes_are_signalled() {
    setup_surface!(state, surface);

    surface
        .set(&ControlRequest::cur(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 0), &[1])
        .unwrap();
    assert_eq!(
        state.try_take_change(),
        Some(ControlChange::Mute {
            channel: 0,
            muted: true
        })
    );

    surface
        .set(&ControlRequest::cur(FEATURE_UNIT_ID, FU_VOLUME_CONTROL, 1), &[0x00, 0xFA])
        .unwrap();
    assert_eq!(
        state.try_take_change(),
        Some(ControlChange::Volume {
            channel: 1,
            volume: -1536
        })
    );
    assert_eq!(state.try_take_change(), None);
}

#[test]
fn gain_combines_master_and_channel_volume() {
    setup_surface!(state, surface);

    state.set_volume(0, -6 * 256).unwrap();
    state.set_volume(1, -6 * 256).unwrap();
    assert_eq!(state.gain().apply(1).left, 1 << 14);

    state.set_mute(0, true).unwrap();
    assert!(state.gain().is_muted());

    state.reset();
    assert_eq!(state.gain(), audio_pipeline::Gain::UNITY);
    assert_eq!(get(&surface, ControlRequest::cur(FEATURE_UNIT_ID, FU_MUTE_CONTROL, 0)), Ok(vec![0]));
}
