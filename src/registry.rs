//! The catalogue of known settings of the Rocket R 60V.
use crate::setting::{Kind, Setting};
use crate::{Error, Result};
use std::fmt;

pub const TEMPERATURE_UNITS: &[&str] = &["Celsius", "Fahrenheit"];
pub const LANGUAGES: &[&str] = &["English", "German", "French", "Italian"];
pub const WATER_FEEDS: &[&str] = &["HardPlumbed", "Reservoir"];
pub const PROFILES: &[&str] = &["A", "B", "C"];
pub const OFF_ON: &[&str] = &["off", "on"];

pub const BREW_BOILER_TEMPERATURE: Kind = Kind::Range { min: 80, max: 110 };
pub const SERVICE_BOILER_TEMPERATURE: Kind = Kind::Range { min: 110, max: 126 };

/// Length of a pressure profile in bytes.
const PROFILE_LENGTH: u16 = crate::profile::ENCODED_LENGTH as u16;

/// All known settings.
pub static SETTINGS: &[Setting] = &[
    Setting::new(
        "temperature_unit",
        0x0000,
        Kind::Choice(TEMPERATURE_UNITS),
        "The temperature unit.",
    ),
    Setting::new(
        "language",
        0x0001,
        Kind::Choice(LANGUAGES),
        "The language of the machine.",
    ),
    Setting::new(
        "brew_boiler_temperature",
        0x0002,
        BREW_BOILER_TEMPERATURE,
        "The desired temperature of the brew boiler.",
    ),
    Setting::new(
        "service_boiler_temperature",
        0x0003,
        SERVICE_BOILER_TEMPERATURE,
        "The desired temperature of the service boiler.",
    ),
    Setting::new("profile_a", 0x0016, Kind::Profile, "The pressure profile A.")
        .with_length(PROFILE_LENGTH),
    Setting::new("profile_b", 0x0026, Kind::Profile, "The pressure profile B.")
        .with_length(PROFILE_LENGTH),
    Setting::new("profile_c", 0x0036, Kind::Profile, "The pressure profile C.")
        .with_length(PROFILE_LENGTH),
    Setting::new(
        "water_feed",
        0x0046,
        Kind::Choice(WATER_FEEDS),
        "The source of the water feed.",
    ),
    Setting::new(
        "active_profile",
        0x0047,
        Kind::Choice(PROFILES),
        "The active pressure profile.",
    ),
    Setting::new(
        "service_boiler",
        0x0049,
        Kind::Choice(OFF_ON),
        "The state of the service boiler.",
    ),
    Setting::new(
        "standby",
        0x004A,
        Kind::Choice(OFF_ON),
        "Is the machine in standby mode.",
    ),
    Setting::new(
        "coffee_cycles_total",
        0x004B,
        Kind::Integer,
        "The total number of coffee cycles.",
    ),
    Setting::new(
        "coffee_cycles_subtotal",
        0x004D,
        Kind::Integer,
        "The number of coffee cycles since the last reset.",
    ),
    Setting::new("auto_on", 0x0051, Kind::TimeOfDay, "The auto on time.").with_length(2),
    Setting::new(
        "auto_standby",
        0x0053,
        Kind::TimeOfDay,
        "The auto standby time.",
    )
    .with_length(2),
    Setting::new(
        "date_time",
        0xA000,
        Kind::DateTime,
        "The date & time (clock) of the machine.",
    )
    .with_length(7),
    Setting::new(
        "current_brew_boiler_temperature",
        0xB000,
        Kind::Integer,
        "The current temperature of the brew boiler.",
    ),
    Setting::new(
        "current_service_boiler_temperature",
        0xB001,
        Kind::Integer,
        "The current temperature of the service boiler.",
    ),
    Setting::new("display", 0xB007, Kind::Display, "The display content.").with_length(48),
    Setting::new(
        "current_brew_time",
        0xB007,
        Kind::BrewTimer,
        "The current brew time, taken from the display.",
    )
    .with_length(16),
];

/// Looks up a setting by name.
pub fn find(name: &str) -> Result<&'static Setting> {
    SETTINGS
        .iter()
        .find(|setting| setting.name == name)
        .ok_or_else(|| Error::UnknownSetting(name.to_string()))
}

/// One row of the address listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressEntry {
    pub address: u16,
    pub length: u16,
    pub name: &'static str,
}

impl fmt::Display for AddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>5}  0x{:04X}  {:>3}  {}",
            self.address, self.address, self.length, self.name
        )
    }
}

/// All settings as `(address, length, name)`, sorted by address.
pub fn addresses() -> Vec<AddressEntry> {
    let mut entries: Vec<AddressEntry> = SETTINGS
        .iter()
        .map(|setting| AddressEntry {
            address: setting.address,
            length: setting.length,
            name: setting.name,
        })
        .collect();
    entries.sort_by_key(|entry| (entry.address, entry.length));
    entries
}
