//! USB Audio 2.0 function: one speaker streaming interface with an explicit
//! feedback endpoint, and one microphone streaming interface.

use audio_control::entity::*;
use audio_control::{AudioControlSurface, ControlError, ControlRequest, FeedbackFormat};
use audio_pipeline::{FRAMES_PER_BUFFER, MonoSample};
use defmt::{debug, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::descriptor::{SynchronizationType, UsageType};
use embassy_usb::driver::{Driver, Endpoint, EndpointType};
use embassy_usb::types::InterfaceNumber;
use embassy_usb::{Builder, Handler};
use static_cell::StaticCell;

use crate::usb::UsbDriver;

pub type EndpointOut = <UsbDriver as Driver<'static>>::EndpointOut;
pub type EndpointIn = <UsbDriver as Driver<'static>>::EndpointIn;

const SAMPLE_SIZE: usize = core::mem::size_of::<MonoSample>();

// One spare sample per packet lets the host speed up when the feedback asks.
pub const SPEAKER_MAX_PACKET_SIZE: usize = (FRAMES_PER_BUFFER + 1) * SAMPLE_SIZE;
pub const MIC_PACKET_SIZE: usize = FRAMES_PER_BUFFER * SAMPLE_SIZE;

// The full-speed PHY is used, so feedback is 10.14 every frame.
pub const FEEDBACK_FORMAT: FeedbackFormat = FeedbackFormat::FullSpeed;

const AUDIO: u8 = 0x01;
const FUNCTION_SUBCLASS_UNDEFINED: u8 = 0x00;
const AUDIOCONTROL: u8 = 0x01;
const AUDIOSTREAMING: u8 = 0x02;
const IP_VERSION_02_00: u8 = 0x20;

const CS_INTERFACE: u8 = 0x24;
const CS_ENDPOINT: u8 = 0x25;

// AC interface descriptor subtypes
const HEADER: u8 = 0x01;
const INPUT_TERMINAL: u8 = 0x02;
const OUTPUT_TERMINAL: u8 = 0x03;
const FEATURE_UNIT: u8 = 0x06;
const CLOCK_SOURCE: u8 = 0x0A;

// AS interface descriptor subtypes
const AS_GENERAL: u8 = 0x01;
const FORMAT_TYPE: u8 = 0x02;
const FORMAT_TYPE_I: u8 = 0x01;
const EP_GENERAL: u8 = 0x01;

const TERMINAL_USB_STREAMING: u16 = 0x0101;
const TERMINAL_MICROPHONE: u16 = 0x0201;
const TERMINAL_SPEAKER: u16 = 0x0301;

const CATEGORY_IO_BOX: u8 = 0x08;

// Two-bit control fields: 0b01 read only, 0b11 host programmable.
const CLOCK_CONTROLS: u8 = 0b0111; // frequency programmable, validity readable
const CONNECTOR_READABLE: u16 = 0b0100;
const MUTE_AND_VOLUME: u32 = 0b1111;

struct Descriptors;

impl Descriptors {
    const fn header(total_length: u16) -> [u8; 7] {
        let [lo, hi] = total_length.to_le_bytes();
        [HEADER, 0x00, 0x02, CATEGORY_IO_BOX, lo, hi, 0x00]
    }

    const fn clock_source() -> [u8; 6] {
        [
            CLOCK_SOURCE,
            CLOCK_SOURCE_ID,
            0x01, // bmAttributes: internal fixed clock
            CLOCK_CONTROLS,
            0x00, // bAssocTerminal
            0x00, // iClockSource
        ]
    }

    const fn input_terminal(id: u8, terminal_type: u16) -> [u8; 15] {
        let [tt_lo, tt_hi] = terminal_type.to_le_bytes();
        let [ctl_lo, ctl_hi] = CONNECTOR_READABLE.to_le_bytes();
        [
            INPUT_TERMINAL,
            id,
            tt_lo,
            tt_hi,
            0x00, // bAssocTerminal
            CLOCK_SOURCE_ID,
            STREAM_CHANNELS,
            0x00,
            0x00,
            0x00,
            0x00, // bmChannelConfig
            0x00, // iChannelNames
            ctl_lo,
            ctl_hi,
            0x00, // iTerminal
        ]
    }

    const fn feature_unit() -> [u8; 12] {
        let [c0, c1, c2, c3] = MUTE_AND_VOLUME.to_le_bytes();
        [
            FEATURE_UNIT,
            FEATURE_UNIT_ID,
            SPEAKER_INPUT_TERMINAL_ID,
            c0,
            c1,
            c2,
            c3, // master channel
            c0,
            c1,
            c2,
            c3,   // channel 1
            0x00, // iFeature
        ]
    }

    const fn output_terminal(id: u8, terminal_type: u16, source: u8) -> [u8; 10] {
        let [tt_lo, tt_hi] = terminal_type.to_le_bytes();
        [
            OUTPUT_TERMINAL,
            id,
            tt_lo,
            tt_hi,
            0x00, // bAssocTerminal
            source,
            CLOCK_SOURCE_ID,
            0x00,
            0x00, // bmControls
            0x00, // iTerminal
        ]
    }

    const fn stream_general(terminal_link: u8) -> [u8; 14] {
        [
            AS_GENERAL,
            terminal_link,
            0x00, // bmControls
            FORMAT_TYPE_I,
            0x01,
            0x00,
            0x00,
            0x00, // bmFormats: PCM
            STREAM_CHANNELS,
            0x00,
            0x00,
            0x00,
            0x00, // bmChannelConfig
            0x00, // iChannelNames
        ]
    }

    const fn format_type() -> [u8; 4] {
        [
            FORMAT_TYPE,
            FORMAT_TYPE_I,
            SAMPLE_SIZE as u8,       // bSubslotSize
            (SAMPLE_SIZE * 8) as u8, // bBitResolution
        ]
    }

    const fn endpoint_general() -> [u8; 6] {
        [EP_GENERAL, 0x00, 0x00, 0x00, 0x00, 0x00]
    }
}

// Every class-specific AC descriptor, header included, with its two-byte
// length and type prefix.
const AC_TOTAL_LENGTH: u16 = (Descriptors::header(0).len()
    + Descriptors::clock_source().len()
    + 2 * Descriptors::input_terminal(0, 0).len()
    + Descriptors::feature_unit().len()
    + 2 * Descriptors::output_terminal(0, 0, 0).len()
    + 7 * 2) as u16;

pub struct AudioUsbHardware {
    pub speaker_out: EndpointOut,
    pub feedback_in: EndpointIn,
    pub mic_in: EndpointIn,
}

/// Answers the class requests addressed to the audio control interface.
pub struct AudioControlHandler {
    control_interface: u8,
    streaming_interfaces: [u8; 2],
    surface: AudioControlSurface<'static, CriticalSectionRawMutex>,
}

impl AudioControlHandler {
    fn decode(&self, req: &Request) -> Option<Result<ControlRequest, ControlError>> {
        if req.request_type != RequestType::Class || req.recipient != Recipient::Interface {
            return None;
        }

        // Other functions (the console) share the class request space.
        if req.index as u8 != self.control_interface {
            return None;
        }

        Some(ControlRequest::decode(req.request, req.value, req.index))
    }
}

impl Handler for AudioControlHandler {
    fn reset(&mut self) {
        info!("USB Audio: Bus reset, controls back to defaults");
        self.surface.state().reset();
    }

    fn set_alternate_setting(&mut self, iface: InterfaceNumber, alternate_setting: u8) {
        let iface = u8::from(iface);
        if self.streaming_interfaces.contains(&iface) {
            info!("USB Audio: Interface {} alt setting {}", iface, alternate_setting);
        }
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        let result = self.decode(&req)?.and_then(|request| {
            debug!("USB Audio: SET {}", request);
            self.surface.set(&request, data)
        });

        Some(match result {
            Ok(()) => OutResponse::Accepted,
            Err(error) => {
                warn!("USB Audio: SET rejected: {}", error);
                OutResponse::Rejected
            }
        })
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        let result = self.decode(&req)?.and_then(|request| {
            debug!("USB Audio: GET {}", request);
            self.surface.get(&request, buf)
        });

        Some(match result {
            Ok(len) => InResponse::Accepted(&buf[..len]),
            Err(error) => {
                warn!("USB Audio: GET rejected: {}", error);
                InResponse::Rejected
            }
        })
    }
}

pub static HANDLER: StaticCell<AudioControlHandler> = StaticCell::new();

/// Writes the audio function into the configuration and registers its
/// request handler.
pub fn build_audio_function(
    builder: &mut Builder<'static, UsbDriver>,
    surface: AudioControlSurface<'static, CriticalSectionRawMutex>,
) -> AudioUsbHardware {
    let mut func = builder.function(AUDIO, FUNCTION_SUBCLASS_UNDEFINED, IP_VERSION_02_00);

    // Audio control interface
    let mut interface = func.interface();
    let control_interface = u8::from(interface.interface_number());
    let mut alt = interface.alt_setting(AUDIO, AUDIOCONTROL, IP_VERSION_02_00, None);

    alt.descriptor(CS_INTERFACE, &Descriptors::header(AC_TOTAL_LENGTH));
    alt.descriptor(CS_INTERFACE, &Descriptors::clock_source());
    alt.descriptor(
        CS_INTERFACE,
        &Descriptors::input_terminal(SPEAKER_INPUT_TERMINAL_ID, TERMINAL_USB_STREAMING),
    );
    alt.descriptor(CS_INTERFACE, &Descriptors::feature_unit());
    alt.descriptor(
        CS_INTERFACE,
        &Descriptors::output_terminal(SPEAKER_OUTPUT_TERMINAL_ID, TERMINAL_SPEAKER, FEATURE_UNIT_ID),
    );
    alt.descriptor(
        CS_INTERFACE,
        &Descriptors::input_terminal(MIC_INPUT_TERMINAL_ID, TERMINAL_MICROPHONE),
    );
    alt.descriptor(
        CS_INTERFACE,
        &Descriptors::output_terminal(MIC_OUTPUT_TERMINAL_ID, TERMINAL_USB_STREAMING, MIC_INPUT_TERMINAL_ID),
    );
    drop(alt);

    // Speaker streaming interface: alt 0 is zero bandwidth.
    let mut interface = func.interface();
    let speaker_interface = u8::from(interface.interface_number());
    drop(interface.alt_setting(AUDIO, AUDIOSTREAMING, IP_VERSION_02_00, None));
    let mut alt = interface.alt_setting(AUDIO, AUDIOSTREAMING, IP_VERSION_02_00, None);

    alt.descriptor(CS_INTERFACE, &Descriptors::stream_general(SPEAKER_INPUT_TERMINAL_ID));
    alt.descriptor(CS_INTERFACE, &Descriptors::format_type());

    let speaker_out = alt.alloc_endpoint_out(EndpointType::Isochronous, None, SPEAKER_MAX_PACKET_SIZE as u16, 1);
    let feedback_in = alt.alloc_endpoint_in(EndpointType::Isochronous, None, FEEDBACK_FORMAT.len() as u16, 1);

    // The feedback endpoint must follow its data endpoint.
    alt.endpoint_descriptor(
        speaker_out.info(),
        SynchronizationType::Asynchronous,
        UsageType::DataEndpoint,
        &[],
    );
    alt.descriptor(CS_ENDPOINT, &Descriptors::endpoint_general());
    alt.endpoint_descriptor(
        feedback_in.info(),
        SynchronizationType::NoSynchronization,
        UsageType::FeedbackEndpoint,
        &[],
    );
    drop(alt);

    // Microphone streaming interface
    let mut interface = func.interface();
    let mic_interface = u8::from(interface.interface_number());
    drop(interface.alt_setting(AUDIO, AUDIOSTREAMING, IP_VERSION_02_00, None));
    let mut alt = interface.alt_setting(AUDIO, AUDIOSTREAMING, IP_VERSION_02_00, None);

    alt.descriptor(CS_INTERFACE, &Descriptors::stream_general(MIC_OUTPUT_TERMINAL_ID));
    alt.descriptor(CS_INTERFACE, &Descriptors::format_type());

    let mic_in = alt.alloc_endpoint_in(EndpointType::Isochronous, None, MIC_PACKET_SIZE as u16, 1);
    alt.endpoint_descriptor(
        mic_in.info(),
        SynchronizationType::Asynchronous,
        UsageType::DataEndpoint,
        &[],
    );
    alt.descriptor(CS_ENDPOINT, &Descriptors::endpoint_general());
    drop(func);

    info!(
        "USB Audio: control {}, speaker {}, microphone {}",
        control_interface, speaker_interface, mic_interface
    );

    let handler = HANDLER.init(AudioControlHandler {
        control_interface,
        streaming_interfaces: [speaker_interface, mic_interface],
        surface,
    });
    builder.handler(handler);

    AudioUsbHardware {
        speaker_out,
        feedback_in,
        mic_in,
    }
}
