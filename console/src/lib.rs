#![cfg_attr(not(test), no_std)]

mod fmt;

mod command;

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Sender};
use heapless::Vec;

pub use command::{Command, HELP, ParseError};

/// Longest command line accepted, newline excluded.
pub const LINE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleEvent {
    Command(Command),
    Rejected(ParseError),
}

/// Assembles newline-terminated commands from a byte stream.
pub struct CommandListener<'ch, M: RawMutex, const N: usize> {
    sender: Sender<'ch, M, ConsoleEvent, N>,
    line: Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl<'ch, M: RawMutex, const N: usize> CommandListener<'ch, M, N> {
    pub fn new(sender: Sender<'ch, M, ConsoleEvent, N>) -> Self {
        CommandListener {
            sender,
            line: Vec::new(),
            overflowed: false,
        }
    }

    pub fn process_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                b'\n' => self.finish_line(),
                b'\r' => {}
                _ if self.overflowed => {}
                _ => {
                    if self.line.push(byte).is_err() {
                        self.overflowed = true;
                    }
                }
            }
        }
    }

    fn finish_line(&mut self) {
        let event = if core::mem::take(&mut self.overflowed) {
            Some(ConsoleEvent::Rejected(ParseError::LineTooLong))
        } else {
            match parse_line(&self.line) {
                Ok(command) => Some(ConsoleEvent::Command(command)),
                // Blank lines are not worth a reply.
                Err(ParseError::Empty) => None,
                Err(error) => Some(ConsoleEvent::Rejected(error)),
            }
        };
        self.line.clear();

        if let Some(event) = event {
            debug!("Console: {}", event);
            // Only fails if full, and then the command is dropped.
            self.sender.try_send(event).ok();
        }
    }
}

pub fn parse_line(line: &[u8]) -> Result<Command, ParseError> {
    core::str::from_utf8(line)
        .map_err(|_| ParseError::UnknownCommand)?
        .parse()
}

#[cfg(test)]
mod test;
