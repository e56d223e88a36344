//! Time based settings: the auto on/standby timers and the machine clock.
use crate::{Error, Result};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// The format accepted for setting the machine clock, e.g. `19.2.20 21:33`.
pub const DATE_TIME_FORMAT: &str = "%d.%m.%y %H:%M";
/// Uses the local clock of this computer.
pub const DATE_TIME_AUTO: &str = "auto";

/// A time of day as stored by the timer settings.
///
/// Hour and minute are sent as their plain byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const HOUR_MAX: u8 = 23;
    pub const MINUTE_MAX: u8 = 59;

    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > Self::HOUR_MAX || minute > Self::MINUTE_MAX {
            return Err(Error::InvalidTimeFormat(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.hour, self.minute]
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        match data {
            [hour, minute] => Self::new(*hour, *minute),
            _ => Err(Error::MalformedResponse(crate::protocol::encode_data(data))),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTimeFormat(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Encodes a date & time for the machine clock.
///
/// `value` is either `auto` for the local time or `dd.mm.yy HH:MM`.
pub fn encode_date_time(value: &str) -> Result<[u8; 7]> {
    let date_time = if value.trim() == DATE_TIME_AUTO {
        Local::now().naive_local()
    } else {
        NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT)
            .map_err(|_| Error::InvalidDateTime(value.to_string()))?
    };
    encode_naive_date_time(&date_time).ok_or_else(|| Error::InvalidDateTime(value.to_string()))
}

/// `[0, minute, hour, weekday (Monday = 1), day, month, year - 2000]`
fn encode_naive_date_time(date_time: &NaiveDateTime) -> Option<[u8; 7]> {
    let year = u8::try_from(date_time.year().checked_sub(2000)?).ok()?;
    Some([
        0,
        date_time.minute() as u8,
        date_time.hour() as u8,
        date_time.weekday().number_from_monday() as u8,
        date_time.day() as u8,
        date_time.month() as u8,
        year,
    ])
}
