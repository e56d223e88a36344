//! Error types shared by the codec, the transport and the settings.
//!
//! Every variant except [`Error::Io`] belongs to the domain family: these are
//! the errors a caller is expected to report to a user. Plain I/O failures
//! (e.g. the machine dropping the connection mid-request) are faults.

/// Represents all possible errors when talking to the machine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The TCP connection could not be established.
    #[error("Connection to {address} failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The machine did not greet with `*HELLO*` after connecting.
    #[error("Machine didn't say hello (\"{0}\"), connection failed")]
    Handshake(String),

    /// No response arrived within the timeout, for every attempt.
    #[error("No response from machine after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// The hex encoded data doesn't match the declared length field.
    #[error("Data length of {actual} hex characters doesn't match declared length of {length} byte(s)")]
    Framing { length: u16, actual: usize },

    /// The response envelope differs from the request envelope.
    #[error("Invalid response envelope, expected \"{expected}\", got \"{actual}\"")]
    EnvelopeMismatch { expected: String, actual: String },

    /// The response checksum doesn't match its content.
    #[error("Invalid response checksum, expected \"{expected}\", got \"{actual}\"")]
    ChecksumMismatch { expected: String, actual: String },

    /// The response can't be parsed as a frame at all.
    #[error("Malformed response \"{0}\"")]
    MalformedResponse(String),

    /// A write wasn't acknowledged with `OK`.
    #[error("Expected response data was \"OK\", got \"{0}\" instead")]
    AckMismatch(String),

    /// A value is not a number or not inside its bounds.
    #[error("Value \"{value}\" is not a number or not in valid range [{min}-{max}]")]
    OutOfRange { value: String, min: i64, max: i64 },

    /// A choice name (or a choice index read from the machine) is unknown.
    #[error("Invalid choice \"{value}\", valid choices are {choices:?}")]
    UnknownChoice {
        value: String,
        choices: &'static [&'static str],
    },

    /// A time of day isn't formatted as `HH:MM` or is out of range.
    #[error("Value \"{0}\" is not a valid time (HH:MM)")]
    InvalidTimeFormat(String),

    /// A profile step value is not a number or not inside its bounds.
    #[error("Step {name} \"{value}\" is not a number or not in valid range [{min:.1}-{max:.1}]")]
    InvalidStep {
        name: &'static str,
        value: String,
        min: f32,
        max: f32,
    },

    /// A profile doesn't consist of 1 to 5 `timing:pressure` steps.
    #[error("Invalid pressure profile format \"{0}\", valid format is up to 5x \"{{timing}}:{{pressure}}\"")]
    InvalidProfile(String),

    /// A date & time isn't `auto` or `dd.mm.yy HH:MM`.
    #[error("Value \"{0}\" is not a valid date & time format (auto | dd.mm.yy HH:MM)")]
    InvalidDateTime(String),

    /// No setting with this name exists.
    #[error("Unknown setting \"{0}\"")]
    UnknownSetting(String),

    /// The setting can only be read.
    #[error("Setting \"{0}\" is read-only")]
    ReadOnly(&'static str),

    /// Wraps `std::io::Error`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for errors of the domain family, `false` for I/O faults.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Error::Io(_))
    }
}

/// The result type for machine operations.
pub type Result<T> = std::result::Result<T, Error>;
