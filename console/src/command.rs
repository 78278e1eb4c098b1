use core::fmt;
use core::str::FromStr;

use fixed::types::I8F8;

pub const HELP: &str = "\
Commands (submit a command by sending a '\\n' newline):
    help            : Displays this
    debug <off/on>  : Controls printing debug info to the console
    volume <dB>     : Output volume, -50 to 0. E.g.: `volume -12.5`
    mute <off/on>   : Mutes the output
    rate <hz>       : Requests a sample rate
    status          : Prints pipeline and control state
    areyouthepico?  : Replies `yes`
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Help,
    Debug(bool),
    /// Volume in 1/256 dB, the unit the audio controls use.
    Volume(i16),
    Mute(bool),
    Rate(u32),
    Status,
    Identify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    Empty,
    UnknownCommand,
    MissingArgument,
    InvalidArgument,
    LineTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseError::Empty => "empty command",
            ParseError::UnknownCommand => "Unrecognised command. Type `help` for more info.",
            ParseError::MissingArgument => "missing argument",
            ParseError::InvalidArgument => "invalid argument",
            ParseError::LineTooLong => "line too long",
        })
    }
}

impl core::error::Error for ParseError {}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_ascii_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?;
        let argument = words.next();

        let command = match name {
            "help" => no_argument(argument, Command::Help)?,
            "status" => no_argument(argument, Command::Status)?,
            "areyouthepico?" => no_argument(argument, Command::Identify)?,
            "debug" => Command::Debug(switch(argument)?),
            "mute" => Command::Mute(switch(argument)?),
            "volume" => {
                let db: I8F8 = argument
                    .ok_or(ParseError::MissingArgument)?
                    .parse()
                    .map_err(|_| ParseError::InvalidArgument)?;
                Command::Volume(db.to_bits())
            }
            "rate" => Command::Rate(
                argument
                    .ok_or(ParseError::MissingArgument)?
                    .parse()
                    .map_err(|_| ParseError::InvalidArgument)?,
            ),
            _ => return Err(ParseError::UnknownCommand),
        };

        if words.next().is_some() {
            return Err(ParseError::InvalidArgument);
        }
        Ok(command)
    }
}

fn no_argument(argument: Option<&str>, command: Command) -> Result<Command, ParseError> {
    match argument {
        Some(_) => Err(ParseError::InvalidArgument),
        None => Ok(command),
    }
}

fn switch(argument: Option<&str>) -> Result<bool, ParseError> {
    match argument {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        Some(_) => Err(ParseError::InvalidArgument),
        None => Err(ParseError::MissingArgument),
    }
}
