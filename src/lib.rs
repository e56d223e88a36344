//! A library for remote controlling the Rocket R 60V espresso machine.
//!
//! The machine is reachable via TCP and speaks a checksummed text protocol:
//! one request frame, one response frame, no pipelining. This crate provides:
//!
//! 1.  **Message Codec**: Building and validating raw frames, see [`protocol`].
//! 2.  **Typed Settings**: Every known memory location of the machine is a
//!     [`setting::Setting`] in the [`registry`], which validates and encodes
//!     values (choices, ranges, timers, pressure profiles, …).
//! 3.  **Client**: [`client::Machine`] owns the connection, retries timed out
//!     requests and exposes the settings by name.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rocket_r60v_lib::{client::Machine, transport::ConnectionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut machine = Machine::connect(&ConnectionConfig::default())?;
//!
//!     println!("Brew boiler: {} °C", machine.get("current_brew_boiler_temperature")?);
//!     machine.set("profile_a", "6:4 18:9 6:5")?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod clock;
pub mod display;
mod error;
pub mod profile;
pub mod protocol;
pub mod registry;
pub mod setting;
pub mod transport;

pub use error::{Error, Result};
