pub mod hardware;

use core::fmt::{self, Write};

use audio_control::ControlError;
use console::{Command, CommandListener, ConsoleEvent, HELP};
use defmt::{info, trace, warn};
use embassy_executor::SpawnToken;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embassy_usb::driver::EndpointError;
use fixed::types::I8F8;
use static_cell::StaticCell;

use crate::audio_task::{CONTROL_STATE, COUNTERS};
use crate::usb::UsbDriver;
use hardware::{ConsoleHardware, MAX_PACKET_SIZE};

pub const CONSOLE_CHANNEL_SIZE: usize = 4;

pub static CONSOLE_CHANNEL: Channel<CriticalSectionRawMutex, ConsoleEvent, CONSOLE_CHANNEL_SIZE> = Channel::new();

type Reply = heapless::String<512>;

pub struct ConsoleTaskState<'a> {
    listener: CommandListener<'a, CriticalSectionRawMutex, CONSOLE_CHANNEL_SIZE>,
    class: CdcAcmClass<'static, UsbDriver>,
    debug: bool,
}

impl<'a> ConsoleTaskState<'a> {
    pub fn new(
        listener: CommandListener<'a, CriticalSectionRawMutex, CONSOLE_CHANNEL_SIZE>,
        class: CdcAcmClass<'static, UsbDriver>,
    ) -> ConsoleTaskState<'a> {
        ConsoleTaskState {
            listener,
            class,
            debug: false,
        }
    }

    fn respond(&mut self, event: ConsoleEvent) -> Reply {
        let mut reply = Reply::new();
        // A reply that does not fit is cut short.
        let _ = match event {
            ConsoleEvent::Command(command) => self.execute(command, &mut reply),
            ConsoleEvent::Rejected(error) => writeln!(reply, "{}", error),
        };
        if self.debug {
            let _ = write_counters(&mut reply);
        }
        reply
    }

    fn execute(&mut self, command: Command, reply: &mut Reply) -> fmt::Result {
        match command {
            Command::Help => reply.write_str(HELP),
            Command::Identify => writeln!(reply, "yes"),
            Command::Debug(on) => {
                self.debug = on;
                writeln!(reply, "debug {}", on_off(on))
            }
            Command::Volume(volume) => report(reply, CONTROL_STATE.set_volume(0, volume)),
            Command::Mute(muted) => report(reply, CONTROL_STATE.set_mute(0, muted)),
            Command::Rate(rate) => report(reply, CONTROL_STATE.set_sample_rate(rate)),
            Command::Status => write_status(reply),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn report(reply: &mut Reply, result: Result<(), ControlError>) -> fmt::Result {
    match result {
        Ok(()) => writeln!(reply, "ok"),
        Err(error) => writeln!(reply, "error: {}", error),
    }
}

fn write_status(reply: &mut Reply) -> fmt::Result {
    let clock = if CONTROL_STATE.clock_valid() { "valid" } else { "not valid" };
    writeln!(reply, "rate: {} Hz, clock {}", CONTROL_STATE.sample_rate(), clock)?;

    // Channel 0 is the master channel and always exists.
    let muted = CONTROL_STATE.mute(0).unwrap_or_default();
    let volume = I8F8::from_bits(CONTROL_STATE.volume(0).unwrap_or_default());
    writeln!(reply, "mute: {}, volume: {} dB", on_off(muted), volume)?;

    write_counters(reply)
}

fn write_counters(reply: &mut Reply) -> fmt::Result {
    let counters = COUNTERS.snapshot();
    writeln!(
        reply,
        "output: {} buffers, {} starved, {} starvation events{}",
        counters.filled_buffers,
        counters.starved_buffers,
        counters.starvation_events,
        if counters.starving { ", starving" } else { "" },
    )?;
    writeln!(
        reply,
        "capture: {} shipped, {} dropped",
        counters.captured_buffers, counters.dropped_buffers,
    )
}

pub static CONSOLE_TASK_STATE: StaticCell<ConsoleTaskState> = StaticCell::new();

pub fn create_console_task(console_hardware: ConsoleHardware) -> SpawnToken<impl Sized> {
    let console_sender = CONSOLE_CHANNEL.sender();
    let listener = CommandListener::new(console_sender);

    console_task(CONSOLE_TASK_STATE.init(ConsoleTaskState::new(listener, console_hardware.class)))
}

struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => {
                warn!("Packet larger than the read buffer, restarting the session");
                Disconnected {}
            }
            EndpointError::Disabled => Disconnected {},
        }
    }
}

async fn write_reply(class: &mut CdcAcmClass<'static, UsbDriver>, reply: &str) -> Result<(), Disconnected> {
    let packet_size = usize::from(MAX_PACKET_SIZE);
    for chunk in reply.as_bytes().chunks(packet_size) {
        class.write_packet(chunk).await?;
    }
    // A full last packet needs a zero-length one to end the transfer.
    if reply.len() % packet_size == 0 {
        class.write_packet(&[]).await?;
    }
    Ok(())
}

async fn console_handler(state: &mut ConsoleTaskState<'static>) -> Result<(), Disconnected> {
    let mut buffer = [0; MAX_PACKET_SIZE as usize];
    loop {
        let n = state.class.read_packet(&mut buffer).await?;
        state.listener.process_bytes(&buffer[..n]);

        while let Ok(event) = CONSOLE_CHANNEL.try_receive() {
            info!("Console: {}", event);
            let reply = state.respond(event);
            write_reply(&mut state.class, &reply).await?;
        }
    }
}

#[embassy_executor::task]
pub async fn console_task(state: &'static mut ConsoleTaskState<'static>) {
    loop {
        state.class.wait_connection().await;
        trace!("Console connected");

        let _ = console_handler(state).await;

        trace!("Console disconnected");
    }
}
