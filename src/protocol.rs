//! Message codec for the Rocket R 60V text protocol.
//!
//! Every request and response is a single ASCII frame:
//!
//! ```text
//! w 0001 0001 00 59
//! | |    |    |  +-- checksum: sum of all preceding bytes mod 256, 2 hex digits
//! | |    |    +----- data: `length` bytes as hex pairs, or `OK` for write acknowledgments
//! | |    +---------- length: number of data bytes, 4 hex digits
//! | +--------------- address: memory address of the setting, 4 hex digits
//! +----------------- command: `r` for reading, `w` for writing
//! ```
//!
//! The first nine characters (command, address and length) are the
//! *envelope*. The machine echoes the request envelope in its response.
//!
//! This module does no I/O. See [`crate::transport`] and [`crate::client`].
use crate::{Error, Result};
use log::*;
use std::fmt;
use std::time::Duration;

/// The IP address the machine uses out of the box.
pub const DEFAULT_HOST: &str = "192.168.1.1";
/// The TCP port the machine listens on.
pub const DEFAULT_PORT: u16 = 1774;
/// Timeout for connecting and for each request attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// Number of attempts for a request before a timeout is reported.
pub const DEFAULT_RETRIES: u32 = 3;
/// Size of a single socket read.
pub const BUFFER_SIZE: usize = 1024;

/// The greeting the machine sends right after a connection is accepted.
pub const HANDSHAKE: &str = "*HELLO*";
/// The response data which acknowledges a write.
pub const ACK: &str = "OK";

/// Length of command, address and length fields.
pub const ENVELOPE_LENGTH: usize = 9;
/// Length of the trailing checksum.
pub const CHECKSUM_LENGTH: usize = 2;

const LENGTH_FIELD: std::ops::Range<usize> = 5..9;

/// The command of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read,
    Write,
}

impl Command {
    pub fn as_char(&self) -> char {
        match self {
            Command::Read => 'r',
            Command::Write => 'w',
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The decoded data of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The machine acknowledged a write with `OK`.
    Ack,
    /// The bytes returned for a read.
    Data(Vec<u8>),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Ack => write!(f, "{ACK}"),
            Payload::Data(data) => {
                let values: Vec<String> = data.iter().map(u8::to_string).collect();
                write!(f, "{}", values.join(" "))
            }
        }
    }
}

/// A single request frame, built once and sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    command: Command,
    address: u16,
    length: u16,
    frame: String,
}

impl Message {
    /// Builds a frame from already hex encoded `data`.
    ///
    /// # Errors
    ///
    /// [`Error::Framing`] if this is a write and `data` is not exactly
    /// `length * 2` hex characters long.
    pub fn new(command: Command, address: u16, length: u16, data: &str) -> Result<Self> {
        if command == Command::Write && data.len() != usize::from(length) * 2 {
            error!(
                "Data \"{data}\" doesn't match the declared length of {length} byte(s) for address {address:#06X}"
            );
            return Err(Error::Framing {
                length,
                actual: data.len(),
            });
        }
        Ok(Self::build(command, address, length, data))
    }

    /// Builds a read request, which never carries data.
    pub fn read(address: u16, length: u16) -> Self {
        Self::build(Command::Read, address, length, "")
    }

    /// Builds a write request for raw byte values.
    pub fn write(address: u16, length: u16, data: &[u8]) -> Result<Self> {
        Self::new(Command::Write, address, length, &encode_data(data))
    }

    fn build(command: Command, address: u16, length: u16, data: &str) -> Self {
        let body = format!("{}{address:04X}{length:04X}{data}", command.as_char());
        let checksum = checksum(&body);
        let frame = format!("{body}{checksum}");
        debug!("Raw message is \"{frame}\"");
        Self {
            command,
            address,
            length,
            frame,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    /// The command, address and length fields.
    pub fn envelope(&self) -> &str {
        &self.frame[..ENVELOPE_LENGTH]
    }

    /// The hex encoded data between envelope and checksum.
    pub fn data(&self) -> &str {
        &self.frame[ENVELOPE_LENGTH..self.frame.len() - CHECKSUM_LENGTH]
    }

    pub fn checksum(&self) -> &str {
        &self.frame[self.frame.len() - CHECKSUM_LENGTH..]
    }

    /// The complete frame as it goes over the wire.
    pub fn frame(&self) -> &str {
        &self.frame
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.frame.as_bytes()
    }

    /// Validates a raw response against this request.
    ///
    /// The envelope must be echoed unchanged and the trailing checksum must
    /// match the rest of the response.
    pub fn validate_response(&self, response: &str) -> Result<()> {
        let response_envelope = response.get(..ENVELOPE_LENGTH).unwrap_or(response);
        if response_envelope != self.envelope() {
            error!(
                "Invalid response envelope, expected \"{}\", got \"{response_envelope}\"",
                self.envelope()
            );
            return Err(Error::EnvelopeMismatch {
                expected: self.envelope().to_string(),
                actual: response_envelope.to_string(),
            });
        }

        if !response.is_ascii() {
            return Err(Error::MalformedResponse(response.to_string()));
        }
        let (body, response_checksum) =
            response.split_at(response.len().saturating_sub(CHECKSUM_LENGTH));
        let calculated_checksum = checksum(body);
        if response_checksum != calculated_checksum {
            error!(
                "Invalid response checksum, expected \"{calculated_checksum}\", got \"{response_checksum}\""
            );
            return Err(Error::ChecksumMismatch {
                expected: calculated_checksum,
                actual: response_checksum.to_string(),
            });
        }

        debug!("Raw response message \"{response}\" validated successfully");
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.frame)
    }
}

fn split_checksum(frame: &str) -> Result<(&str, &str)> {
    if frame.len() < ENVELOPE_LENGTH + CHECKSUM_LENGTH || !frame.is_ascii() {
        return Err(Error::MalformedResponse(frame.to_string()));
    }
    Ok(frame.split_at(frame.len() - CHECKSUM_LENGTH))
}

/// Calculates the checksum of a frame without its checksum.
///
/// The checksum is the sum of all bytes modulo 256, as two upper case hex
/// digits.
pub fn checksum(message: &str) -> String {
    let sum = message.bytes().fold(0u8, |sum, byte| sum.wrapping_add(byte));
    format!("{sum:02X}")
}

/// Encodes byte values as upper case hex pairs. No data encodes to `""`.
pub fn encode_data(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02X}")).collect()
}

/// Parses user supplied data such as `"6"`, `"0x3C, 0"` or `"60 0 180"` into bytes.
pub fn parse_data(text: &str) -> Result<Vec<u8>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
                Some(hex) => u8::from_str_radix(hex, 16),
                None => token.parse::<u8>(),
            };
            parsed.map_err(|_| Error::OutOfRange {
                value: token.to_string(),
                min: u8::MIN.into(),
                max: u8::MAX.into(),
            })
        })
        .collect()
}

/// Extracts the data of a raw frame.
///
/// Reads the length field of the envelope and decodes exactly that many
/// hex pairs. Data starting with `OK` is a write acknowledgment and decodes
/// to [`Payload::Ack`] regardless of the declared length.
pub fn decode_data(frame: &str) -> Result<Payload> {
    let malformed = || Error::MalformedResponse(frame.to_string());
    let (body, _) = split_checksum(frame)?;

    let length = u16::from_str_radix(&body[LENGTH_FIELD], 16).map_err(|_| malformed())?;
    let data = &body[ENVELOPE_LENGTH..];
    if data.starts_with(ACK) {
        return Ok(Payload::Ack);
    }

    let hex = data
        .get(..usize::from(length) * 2)
        .ok_or_else(malformed)?;
    hex.as_bytes()
        .chunks(2)
        .map(|pair| decode_hex_pair(pair).ok_or_else(malformed))
        .collect::<Result<Vec<u8>>>()
        .map(Payload::Data)
}

/// Total length of the frame starting with `partial`.
///
/// Returns `None` until enough of the frame arrived to tell, i.e. the
/// envelope and the first two data characters. An acknowledgment is always
/// 13 characters long, a data frame `9 + 2 * length + 2`. If the length
/// field is garbage the frame is considered complete as it is.
pub fn expected_frame_length(partial: &[u8]) -> Option<usize> {
    let data_start = partial.get(ENVELOPE_LENGTH..ENVELOPE_LENGTH + ACK.len())?;
    if data_start == ACK.as_bytes() {
        return Some(ENVELOPE_LENGTH + ACK.len() + CHECKSUM_LENGTH);
    }
    let length = std::str::from_utf8(&partial[LENGTH_FIELD])
        .ok()
        .and_then(|field| u16::from_str_radix(field, 16).ok());
    Some(match length {
        Some(length) => ENVELOPE_LENGTH + usize::from(length) * 2 + CHECKSUM_LENGTH,
        None => partial.len(),
    })
}

fn decode_hex_pair(pair: &[u8]) -> Option<u8> {
    let high = char::from(*pair.first()?).to_digit(16)?;
    let low = char::from(*pair.get(1)?).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn checksum_of_known_frames() {
        assert_eq!(checksum("r00010001"), "F4");
        assert_eq!(checksum("w0001000100"), "59");
        assert_eq!(checksum("w00010001OK"), "93");
        assert_eq!(checksum(""), "00");
        // 'z' * 3 = 366 = 0x16E
        assert_eq!(checksum("zzz"), "6E");
        assert_eq!(checksum("\u{1}"), "01");
    }

    #[test]
    fn build_read_frame() {
        let message = Message::read(0x0001, 1);
        assert_eq!(message.frame(), "r00010001F4");
        assert_eq!(message.envelope(), "r00010001");
        assert_eq!(message.data(), "");
        assert_eq!(message.checksum(), "F4");
        assert_eq!(message.as_bytes(), b"r00010001F4");

        assert_eq!(Message::read(0xB007, 48).frame(), "rB00700300E");
    }

    #[test]
    fn build_write_frame() {
        let message = Message::write(0x0001, 1, &[1]).unwrap();
        assert_eq!(message.frame(), "w00010001015A");
        assert_eq!(message.command(), Command::Write);
        assert_eq!(message.address(), 1);
        assert_eq!(message.length(), 1);
        assert_eq!(message.data(), "01");

        let message = Message::write(0x0051, 2, &[6, 0]).unwrap();
        assert_eq!(message.to_string(), "w005100020600C5");

        let message = Message::new(Command::Write, 0x0002, 1, "69").unwrap();
        assert_eq!(message.frame(), "w000200016969");
    }

    #[test]
    fn frame_length_follows_declared_length() {
        for length in [1u16, 2, 7, 15, 48] {
            let data = vec![0xAB; usize::from(length)];
            let message = Message::write(0x1234, length, &data).unwrap();
            assert_eq!(message.frame().len(), 9 + 2 * usize::from(length) + 2);
        }
    }

    #[test]
    fn write_with_wrong_data_length() {
        assert_matches!(
            Message::write(0x0010, 4, &[1, 2, 3]),
            Err(Error::Framing {
                length: 4,
                actual: 6
            })
        );
        assert_matches!(
            Message::write(0x0010, 1, &[1, 2]),
            Err(Error::Framing { .. })
        );
        assert_matches!(
            Message::new(Command::Write, 0x0010, 1, ""),
            Err(Error::Framing { .. })
        );
        // Reads never carry data, so the length is not checked against it.
        assert!(Message::new(Command::Read, 0x0010, 4, "").is_ok());
    }

    #[test]
    fn encode_data_values() {
        assert_eq!(encode_data(&[]), "");
        assert_eq!(encode_data(&[0]), "00");
        assert_eq!(encode_data(&[105]), "69");
        assert_eq!(encode_data(&[60, 0, 180, 255]), "3C00B4FF");
    }

    #[test]
    fn parse_data_values() {
        assert_eq!(parse_data("").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_data("105").unwrap(), vec![105]);
        assert_eq!(parse_data("60, 0,180 0x0A").unwrap(), vec![60, 0, 180, 10]);
        assert_matches!(parse_data("256"), Err(Error::OutOfRange { .. }));
        assert_matches!(parse_data("abc"), Err(Error::OutOfRange { .. }));
    }

    #[test]
    fn decode_read_response() {
        assert_eq!(
            decode_data("r000100010054").unwrap(),
            Payload::Data(vec![0])
        );
        assert_eq!(
            decode_data("r000200016964").unwrap(),
            Payload::Data(vec![105])
        );
        assert_eq!(
            decode_data("r0016000F3C00B4003C0000000000285A32000016").unwrap(),
            Payload::Data(vec![60, 0, 180, 0, 60, 0, 0, 0, 0, 0, 40, 90, 50, 0, 0])
        );
    }

    #[test]
    fn decode_acknowledgment() {
        assert_eq!(decode_data("w00010001OK93").unwrap(), Payload::Ack);
        // The acknowledgment is shorter than the declared length of 15 bytes.
        assert_eq!(decode_data("w0016000FOKAE").unwrap(), Payload::Ack);
    }

    #[test]
    fn decode_malformed_frames() {
        assert_matches!(decode_data("r0001"), Err(Error::MalformedResponse(..)));
        assert_matches!(
            decode_data("r0001000200F4"),
            Err(Error::MalformedResponse(..))
        );
        assert_matches!(
            decode_data("r00010001ZZ00"),
            Err(Error::MalformedResponse(..))
        );
        assert_matches!(
            decode_data("r0001XXXX0000"),
            Err(Error::MalformedResponse(..))
        );
    }

    #[test]
    fn decode_data_reverses_build() {
        let cases: [(u16, Vec<u8>); 4] = [
            (0x0000, vec![0]),
            (0xFFFF, vec![255]),
            (0x0016, vec![60, 0, 180, 0, 60, 0, 0, 0, 0, 0, 40, 90, 50, 0, 0]),
            (0xA000, vec![0, 33, 21, 3, 19, 2, 20]),
        ];
        for (address, data) in cases {
            let length = data.len() as u16;
            let message = Message::write(address, length, &data).unwrap();
            assert_eq!(decode_data(message.frame()).unwrap(), Payload::Data(data));
            assert_eq!(
                expected_frame_length(message.as_bytes()),
                Some(message.frame().len())
            );
        }
    }

    #[test]
    fn validate_matching_response() {
        let message = Message::read(0x0001, 1);
        assert!(message.validate_response("r000100010054").is_ok());

        let message = Message::write(0x0001, 1, &[1]).unwrap();
        assert!(message.validate_response("w00010001OK93").is_ok());
    }

    #[test]
    fn validate_envelope_mismatch() {
        let message = Message::read(0x0001, 1);
        for response in [
            "r000200016964",
            "w000100010054",
            "r000100020054",
            "r0001",
            "",
        ] {
            assert_matches!(
                message.validate_response(response),
                Err(Error::EnvelopeMismatch { .. })
            );
        }
    }

    #[test]
    fn validate_checksum_mismatch() {
        let message = Message::read(0x0001, 1);
        assert_matches!(
            message.validate_response("r000100010055"),
            Err(Error::ChecksumMismatch { expected, actual }) if expected == "54" && actual == "55"
        );
        // Envelope only, the last two characters are taken as checksum.
        assert_matches!(
            message.validate_response("r00010001"),
            Err(Error::ChecksumMismatch { expected, actual }) if expected == "93" && actual == "01"
        );
        assert_matches!(
            message.validate_response("r0001000100"),
            Err(Error::ChecksumMismatch { expected, actual }) if expected == "F4" && actual == "00"
        );
    }

    #[test]
    fn frame_length_from_partial_frame() {
        assert_eq!(expected_frame_length(b""), None);
        assert_eq!(expected_frame_length(b"r00010001"), None);
        assert_eq!(expected_frame_length(b"r000100010"), None);
        assert_eq!(expected_frame_length(b"r0001000100"), Some(13));
        assert_eq!(expected_frame_length(b"w00010001OK"), Some(13));
        assert_eq!(expected_frame_length(b"w0016000FOK"), Some(13));
        assert_eq!(expected_frame_length(b"rB00700304252"), Some(9 + 96 + 2));
        assert_eq!(expected_frame_length(b"r0001XXXX0000"), Some(13));
        assert_eq!(expected_frame_length(b"r0001XXXX00"), Some(11));
    }

    #[test]
    fn payload_display() {
        assert_eq!(Payload::Ack.to_string(), "OK");
        assert_eq!(Payload::Data(vec![6, 0, 255]).to_string(), "6 0 255");
    }
}
