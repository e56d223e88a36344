//! Typed settings of the machine.
//!
//! A [`Setting`] describes one memory location of the machine: its name,
//! address, length and [`Kind`]. The kind decides how a value given by the
//! user is validated and encoded for a write, and how the bytes read back
//! are decoded into a [`Value`]. Every `get`/`set` is exactly one request.
use crate::client::Machine;
use crate::clock::{self, TimeOfDay};
use crate::display;
use crate::profile::Profile;
use crate::protocol::{self as proto, Message, Payload};
use crate::transport::Transport;
use crate::{Error, Result};
use log::*;
use std::fmt;

/// Returned when reading a setting which can only be written.
pub const WRITE_ONLY_MESSAGE: &str =
    "The date & time can only be set and not read (\"fire & forget\" if you will so).";

/// How the value of a setting is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A read-only plain integer.
    Integer,
    /// An index into a list of names.
    Choice(&'static [&'static str]),
    /// An integer within inclusive bounds.
    Range { min: i64, max: i64 },
    /// `HH:MM`, one byte for the hour and one for the minute.
    TimeOfDay,
    /// A five step pressure profile, see [`crate::profile`].
    Profile,
    /// The display content as text.
    Display,
    /// The running brew timer, taken from the display.
    BrewTimer,
    /// The clock of the machine, which can only be written.
    DateTime,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Integer => write!(f, "read-only"),
            Kind::Choice(choices) => write!(f, "{}", choices.join("|")),
            Kind::Range { min, max } => write!(f, "{min}-{max}"),
            Kind::TimeOfDay => write!(f, "HH:MM"),
            Kind::Profile => write!(f, "up to 5x timing:pressure"),
            Kind::Display => write!(f, "read-only text"),
            Kind::BrewTimer => write!(f, "read-only seconds"),
            Kind::DateTime => write!(f, "write-only, auto | dd.mm.yy HH:MM"),
        }
    }
}

/// The result of reading or writing a setting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The write was acknowledged.
    Ack,
    Integer(u8),
    /// Plain data longer than one byte.
    Bytes(Vec<u8>),
    Choice(&'static str),
    Text(String),
    /// Seconds of the brew timer, `None` if no timer is running.
    Seconds(Option<f32>),
    /// The setting can't be read, with the reason.
    Unsupported(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ack => write!(f, "{}", proto::ACK),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Bytes(data) => write!(f, "{}", Payload::Data(data.clone())),
            Value::Choice(choice) => write!(f, "{choice}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Seconds(Some(seconds)) => write!(f, "{seconds}"),
            Value::Seconds(None) => write!(f, "None"),
            Value::Unsupported(message) => write!(f, "{message}"),
        }
    }
}

/// A named setting at a fixed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: &'static str,
    pub address: u16,
    /// Number of data bytes.
    pub length: u16,
    pub kind: Kind,
    pub description: &'static str,
}

impl Setting {
    pub const fn new(
        name: &'static str,
        address: u16,
        kind: Kind,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            address,
            length: 1,
            kind,
            description,
        }
    }

    pub const fn with_length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self.kind, Kind::DateTime)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self.kind, Kind::Integer | Kind::Display | Kind::BrewTimer)
    }

    /// Validates a user supplied value and encodes it into the data bytes.
    pub fn encode(&self, value: &str) -> Result<Vec<u8>> {
        match self.kind {
            Kind::Integer | Kind::Display | Kind::BrewTimer => Err(Error::ReadOnly(self.name)),
            Kind::Choice(choices) => encode_choice(choices, value).map(|index| vec![index]),
            Kind::Range { min, max } => {
                let value = validate_range(value.trim(), min, max)?;
                u8::try_from(value)
                    .map(|value| vec![value])
                    .map_err(|_| Error::OutOfRange {
                        value: value.to_string(),
                        min,
                        max,
                    })
            }
            Kind::TimeOfDay => Ok(value.parse::<TimeOfDay>()?.encode().to_vec()),
            Kind::Profile => Ok(value.parse::<Profile>()?.encode().to_vec()),
            Kind::DateTime => Ok(clock::encode_date_time(value)?.to_vec()),
        }
    }

    /// Decodes the data bytes read from the machine.
    pub fn decode(&self, data: Vec<u8>) -> Result<Value> {
        match self.kind {
            Kind::Integer if data.len() == 1 => Ok(Value::Integer(data[0])),
            Kind::Integer => Ok(Value::Bytes(data)),
            Kind::Choice(choices) => decode_choice(choices, self.scalar(&data)?).map(Value::Choice),
            Kind::Range { min, max } => {
                let value = self.scalar(&data)?;
                validate_range(&value.to_string(), min, max)?;
                Ok(Value::Integer(value))
            }
            Kind::TimeOfDay => Ok(Value::Text(TimeOfDay::decode(&data)?.to_string())),
            Kind::Profile => Ok(Value::Text(Profile::decode(&data)?.to_string())),
            Kind::Display => Ok(Value::Text(display::decode_text(&data))),
            Kind::BrewTimer => Ok(Value::Seconds(display::parse_brew_time(
                &display::decode_text(&data),
            ))),
            Kind::DateTime => Ok(Value::Unsupported(WRITE_ONLY_MESSAGE)),
        }
    }

    fn scalar(&self, data: &[u8]) -> Result<u8> {
        match data {
            [value] => Ok(*value),
            _ => Err(Error::MalformedResponse(proto::encode_data(data))),
        }
    }

    /// Reads the setting from the machine.
    pub fn get<T: Transport>(&self, machine: &mut Machine<T>) -> Result<Value> {
        if !self.is_readable() {
            info!("Setting {} can't be read", self.name);
            return Ok(Value::Unsupported(WRITE_ONLY_MESSAGE));
        }

        debug!("Getting value for {} from machine…", self.name);
        let data = match machine.send_message(&Message::read(self.address, self.length))? {
            Payload::Data(data) => data,
            Payload::Ack => return Err(Error::MalformedResponse(proto::ACK.to_string())),
        };
        let value = self.decode(data)?;
        info!("Value of {} is \"{value}\"", self.name);
        Ok(value)
    }

    /// Validates and writes a value to the machine.
    ///
    /// Invalid values are rejected before anything is sent.
    pub fn set<T: Transport>(&self, machine: &mut Machine<T>, value: &str) -> Result<Value> {
        debug!("Setting value for {} on machine to \"{value}\"…", self.name);
        let data = self.encode(value).inspect_err(|err| error!("{err}"))?;
        let message = Message::write(self.address, self.length, &data)?;
        match machine.send_message(&message)? {
            Payload::Ack => Ok(Value::Ack),
            Payload::Data(data) => {
                let data = proto::encode_data(&data);
                error!("Expected response data was \"OK\", got \"{data}\" instead");
                Err(Error::AckMismatch(data))
            }
        }
    }
}

fn encode_choice(choices: &'static [&'static str], choice: &str) -> Result<u8> {
    choices
        .iter()
        .position(|candidate| *candidate == choice)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| Error::UnknownChoice {
            value: choice.to_string(),
            choices,
        })
}

fn decode_choice(choices: &'static [&'static str], index: u8) -> Result<&'static str> {
    choices
        .get(usize::from(index))
        .copied()
        .ok_or_else(|| {
            error!("Unknown choice (#{index}) on machine");
            Error::UnknownChoice {
                value: format!("#{index}"),
                choices,
            }
        })
}

fn validate_range(value: &str, min: i64, max: i64) -> Result<i64> {
    value
        .parse::<i64>()
        .ok()
        .filter(|parsed| (min..=max).contains(parsed))
        .ok_or_else(|| Error::OutOfRange {
            value: value.to_string(),
            min,
            max,
        })
}
