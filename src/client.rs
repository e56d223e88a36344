//! Synchronous client for the Rocket R 60V.
//!
//! [`Machine`] owns the transport and sends one request at a time. It retries
//! a request when the machine doesn't answer in time, validates every
//! response against its request and exposes the named settings of the
//! [`crate::registry`] as well as raw reads and writes for debugging.
//!
//! ## Example
//!
//! ```no_run
//! use rocket_r60v_lib::{client::Machine, transport::ConnectionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig {
//!         host: "192.168.1.1".to_string(),
//!         ..Default::default()
//!     };
//!     let mut machine = Machine::connect(&config)?;
//!
//!     println!("Language: {}", machine.get("language")?);
//!     machine.set("brew_boiler_temperature", "105")?;
//!
//!     machine.disconnect()?;
//!     Ok(())
//! }
//! ```
use crate::protocol::{self as proto, Command, Message, Payload};
use crate::setting::Value;
use crate::transport::{is_timeout, ConnectionConfig, TcpTransport, Transport};
use crate::{registry, Error, Result};
use log::*;

/// Data for a raw write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData {
    /// Sent verbatim as the data field, e.g. `"3C00"`.
    Hex(String),
    /// Byte values, hex encoded before sending.
    Bytes(Vec<u8>),
}

/// A connection to one machine.
#[derive(Debug)]
pub struct Machine<T: Transport = TcpTransport> {
    transport: T,
    retries: u32,
}

impl Machine<TcpTransport> {
    /// Connects to the machine via TCP and completes the handshake.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(TcpTransport::connect(config)?).with_retries(config.retries))
    }

    /// Closes the connection.
    pub fn disconnect(self) -> Result<()> {
        self.transport.disconnect()
    }
}

impl<T: Transport> Machine<T> {
    /// Creates a client on top of an established transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retries: proto::DEFAULT_RETRIES,
        }
    }

    /// Sets the number of attempts per request, at least one.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a message and returns the data of the validated response.
    ///
    /// A timed out attempt resends the identical frame until the configured
    /// number of attempts is used up, then [`Error::Timeout`] is returned.
    /// Invalid responses are never retried.
    pub fn send_message(&mut self, message: &Message) -> Result<Payload> {
        for attempt in 1..=self.retries {
            debug!("Sending \"{message}\", attempt {attempt}…");
            match self.transport.send_and_receive(message.as_bytes()) {
                Ok(raw) => {
                    let response = String::from_utf8(raw).map_err(|err| {
                        Error::MalformedResponse(String::from_utf8_lossy(err.as_bytes()).into_owned())
                    })?;
                    message.validate_response(&response)?;
                    let payload = proto::decode_data(&response)?;
                    info!("Received message data is \"{payload}\"");
                    return Ok(payload);
                }
                Err(err) if is_timeout(&err) => {
                    if attempt < self.retries {
                        warn!("Timeout occurred on attempt {attempt} of {}, retrying…", self.retries);
                    } else {
                        error!("Timeout occurred on final attempt {attempt}");
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::Timeout {
            attempts: self.retries,
        })
    }

    /// Reads the named setting.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        registry::find(name)?.get(self)
    }

    /// Writes the named setting.
    pub fn set(&mut self, name: &str, value: &str) -> Result<Value> {
        registry::find(name)?.set(self, value)
    }

    /// Reads `length` bytes at `address`, bypassing the settings.
    pub fn read_raw(&mut self, address: u16, length: u16) -> Result<Payload> {
        info!("Reading {length} byte(s) at {address:#06X}");
        self.send_message(&Message::read(address, length))
    }

    /// Writes `length` bytes at `address`, bypassing the settings.
    pub fn write_raw(&mut self, address: u16, length: u16, data: &RawData) -> Result<Payload> {
        let message = match data {
            RawData::Hex(hex) => Message::new(Command::Write, address, length, hex)?,
            RawData::Bytes(bytes) => Message::write(address, length, bytes)?,
        };
        info!("Writing \"{}\" at {address:#06X}", message.data());
        self.send_message(&message)
    }
}
