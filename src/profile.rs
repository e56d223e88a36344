//! Pressure profiles.
//!
//! A profile has five steps, each a timing in seconds and a pressure in bar,
//! both with one decimal place. On the machine a profile occupies 15 bytes:
//!
//! ```text
//! byte  0..10: timing * 10 of step 1..5, two bytes each, low byte first
//! byte 10..15: pressure * 10 of step 1..5, one byte each
//! ```
//!
//! As text a profile is written as `timing:pressure` steps separated by
//! blanks, e.g. `6:4 18:9 6:5 0:0 0:0`.
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Number of steps of a profile.
pub const STEPS: usize = 5;
/// Number of bytes of an encoded profile.
pub const ENCODED_LENGTH: usize = STEPS * 3;

pub const TIMING_MIN: f32 = 0.0;
pub const TIMING_MAX: f32 = 60.0;
pub const PRESSURE_MIN: f32 = 0.0;
pub const PRESSURE_MAX: f32 = 10.0;

/// One step of a profile, stored in tenths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Step {
    timing: u16,
    pressure: u8,
}

impl Step {
    fn parse(timing: &str, pressure: &str) -> Result<Self> {
        let timing = parse_tenths("timing", timing, TIMING_MIN, TIMING_MAX)?;
        let pressure = parse_tenths("pressure", pressure, PRESSURE_MIN, PRESSURE_MAX)?;
        Ok(Self {
            timing,
            pressure: pressure as u8,
        })
    }

    fn from_tenths(timing: u16, pressure: u8) -> Result<Self> {
        check_tenths("timing", timing, TIMING_MAX)?;
        check_tenths("pressure", u16::from(pressure), PRESSURE_MAX)?;
        Ok(Self { timing, pressure })
    }

    /// Timing in seconds.
    pub fn timing(&self) -> f32 {
        f32::from(self.timing) / 10.0
    }

    /// Pressure in bar.
    pub fn pressure(&self) -> f32 {
        f32::from(self.pressure) / 10.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            format_tenths(self.timing),
            format_tenths(u16::from(self.pressure))
        )
    }
}

/// A complete pressure profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    steps: [Step; STEPS],
}

impl Profile {
    pub fn steps(&self) -> &[Step; STEPS] {
        &self.steps
    }

    /// Packs the profile into the 15 bytes stored on the machine.
    pub fn encode(&self) -> [u8; ENCODED_LENGTH] {
        let mut data = [0; ENCODED_LENGTH];
        for (i, step) in self.steps.iter().enumerate() {
            let [low, high] = step.timing.to_le_bytes();
            data[i * 2] = low;
            data[i * 2 + 1] = high;
            data[STEPS * 2 + i] = step.pressure;
        }
        data
    }

    /// Unpacks a profile read from the machine.
    ///
    /// Fails with [`Error::InvalidStep`] if the machine returns a timing or
    /// pressure out of range.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != ENCODED_LENGTH {
            return Err(Error::MalformedResponse(crate::protocol::encode_data(data)));
        }
        let mut steps = [Step::default(); STEPS];
        for (i, step) in steps.iter_mut().enumerate() {
            let timing = u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]);
            *step = Step::from_tenths(timing, data[STEPS * 2 + i])?;
        }
        Ok(Self { steps })
    }
}

impl FromStr for Profile {
    type Err = Error;

    /// Parses 1 to 5 `timing:pressure` steps, missing steps are zero.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidProfile(s.to_string());
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > STEPS {
            return Err(invalid());
        }

        let mut steps = [Step::default(); STEPS];
        for (step, token) in steps.iter_mut().zip(tokens) {
            let (timing, pressure) = token.split_once(':').ok_or_else(invalid)?;
            *step = Step::parse(timing, pressure)?;
        }
        Ok(Self { steps })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(Step::to_string).collect();
        write!(f, "{}", steps.join(" "))
    }
}

fn parse_tenths(name: &'static str, value: &str, min: f32, max: f32) -> Result<u16> {
    let invalid = || Error::InvalidStep {
        name,
        value: value.to_string(),
        min,
        max,
    };
    // Ties go to the even tenth, e.g. 0.25 becomes 0.2
    let tenths = (value.trim().parse::<f64>().map_err(|_| invalid())? * 10.0).round_ties_even();
    if tenths.is_nan() || tenths < f64::from(min) * 10.0 || tenths > f64::from(max) * 10.0 {
        return Err(invalid());
    }
    Ok(tenths as u16)
}

fn check_tenths(name: &'static str, tenths: u16, max: f32) -> Result<()> {
    if f32::from(tenths) > max * 10.0 {
        return Err(Error::InvalidStep {
            name,
            value: format_tenths(tenths),
            min: 0.0,
            max,
        });
    }
    Ok(())
}

/// Integral values are written without decimal place.
fn format_tenths(tenths: u16) -> String {
    match tenths % 10 {
        0 => format!("{}", tenths / 10),
        fraction => format!("{}.{fraction}", tenths / 10),
    }
}
