use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};
use pretty_assertions::assert_eq;

use crate::{Command, CommandListener, ConsoleEvent, ParseError, parse_line};

macro_rules! setup {
    ($receiver:ident, $listener:ident) => {
        let channel = Channel::<NoopRawMutex, ConsoleEvent, 4>::new();
        let sender = channel.sender();
        let $receiver = channel.receiver();
        let mut $listener = CommandListener::new(sender);
    };
}

macro_rules! drain {
    ($receiver:expr) => {{
        let mut events = Vec::new();
        while let Ok(event) = $receiver.try_receive() {
            events.push(event);
        }
        events
    }};
}

#[test]
fn commands_are_parsed_once_the_newline_arrives() {
    setup!(receiver, listener);

    listener.process_bytes(b"mute o");
    assert!(drain!(receiver).is_empty());

    listener.process_bytes(b"n\r\nvolume -12.5\n");
    assert_eq!(
        drain!(receiver),
        vec![
            ConsoleEvent::Command(Command::Mute(true)),
            ConsoleEvent::Command(Command::Volume(-12 * 256 - 128)),
        ]
    );
}

#[test]
fn every_command_is_recognised() {
    assert_eq!(parse_line(b"help"), Ok(Command::Help));
    assert_eq!(parse_line(b"status"), Ok(Command::Status));
    assert_eq!(parse_line(b"areyouthepico?"), Ok(Command::Identify));
    assert_eq!(parse_line(b"debug on"), Ok(Command::Debug(true)));
    assert_eq!(parse_line(b"debug off"), Ok(Command::Debug(false)));
    assert_eq!(parse_line(b"mute off"), Ok(Command::Mute(false)));
    assert_eq!(parse_line(b"rate 48000"), Ok(Command::Rate(48_000)));
    assert_eq!(parse_line(b"  volume   0  "), Ok(Command::Volume(0)));
}

#[test]
fn bad_arguments_are_reported() {
    assert_eq!(parse_line(b""), Err(ParseError::Empty));
    assert_eq!(parse_line(b"servo 10"), Err(ParseError::UnknownCommand));
    assert_eq!(parse_line(b"volume"), Err(ParseError::MissingArgument));
    assert_eq!(parse_line(b"volume loud"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"volume -300"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"debug maybe"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"rate -1"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"help me"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(&[0xFF, 0xFE]), Err(ParseError::UnknownCommand));
}

#[test]
fn commands_without_arguments_reject_a_stray_word() {
    assert_eq!(parse_line(b"help me"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"status now"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"areyouthepico? yes"), Err(ParseError::InvalidArgument));
    assert_eq!(parse_line(b"status"), Ok(Command::Status));
}

#[test]
fn blank_lines_are_ignored_and_unknown_ones_rejected() {
    setup!(receiver, listener);

    listener.process_bytes(b"\n\r\n   \nfoo\n");

    assert_eq!(
        drain!(receiver),
        vec![ConsoleEvent::Rejected(ParseError::UnknownCommand)]
    );
}

#[test]
fn overlong_line_is_discarded_up_to_the_next_newline() {
    setup!(receiver, listener);

    listener.process_bytes(&[b'x'; 100]);
    listener.process_bytes(b" status\nstatus\n");

    assert_eq!(
        drain!(receiver),
        vec![
            ConsoleEvent::Rejected(ParseError::LineTooLong),
            ConsoleEvent::Command(Command::Status),
        ]
    );
}

#[test]
fn when_overflowing_it_discards_the_overflow() {
    setup!(receiver, listener);

    listener.process_bytes(b"help\nhelp\nhelp\nhelp\nstatus\nstatus\n");

    assert_eq!(drain!(receiver), vec![ConsoleEvent::Command(Command::Help); 4]);
}
