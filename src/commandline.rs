use clap::builder::{PossibleValue, PossibleValuesParser};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use rocket_r60v_lib::{registry, setting::Setting};
use std::path::PathBuf;
use std::time::Duration;

fn parse_address(s: &str) -> Result<u16, String> {
    clap_num::maybe_hex::<u16>(s).map_err(|e| format!("Invalid address format: {e}"))
}

fn parse_length(s: &str) -> Result<u16, String> {
    let length = clap_num::maybe_hex::<u16>(s).map_err(|e| format!("Invalid length format: {e}"))?;
    if length == 0 {
        return Err("Length must be at least 1 byte".to_string());
    }
    Ok(length)
}

/// The names of the settings accepted by `filter`, described for `--help`.
fn setting_names(filter: fn(&Setting) -> bool) -> PossibleValuesParser {
    PossibleValuesParser::new(
        registry::SETTINGS
            .iter()
            .filter(|setting| filter(setting))
            .map(|setting| PossibleValue::new(setting.name).help(setting.description)),
    )
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Read a setting from the machine.
    /// Use `list` to see all settings and their values.
    #[clap(verbatim_doc_comment)]
    Get {
        /// Name of the setting.
        #[arg(value_parser = setting_names(|_| true))]
        setting: String,
    },

    /// Write a setting to the machine.
    /// Examples: "language German", "brew_boiler_temperature 105",
    /// "auto_on 06:30", "profile_a '6:4 18:9 6:5'", "date_time auto".
    #[clap(verbatim_doc_comment)]
    Set {
        /// Name of the setting, read-only settings are not accepted.
        #[arg(value_parser = setting_names(Setting::is_writable))]
        setting: String,
        /// The new value.
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// List all known settings sorted by memory address.
    /// Columns: decimal address, hex address, length in bytes, name and valid values.
    #[clap(verbatim_doc_comment)]
    List,

    /// Read raw data from a memory address, for debugging.
    ReadRaw {
        /// Memory address, decimal or hexadecimal (e.g. "0xB007").
        #[arg(value_parser = parse_address, verbatim_doc_comment)]
        address: u16,
        /// Data length in bytes.
        #[arg(value_parser = parse_length, default_value = "1")]
        length: u16,
    },

    /// Write raw data to a memory address, for debugging.
    /// **Warning:** Nothing is validated, invalid data may put the machine into an undefined state.
    #[clap(verbatim_doc_comment)]
    WriteRaw {
        /// Memory address, decimal or hexadecimal (e.g. "0x0051").
        #[arg(value_parser = parse_address, verbatim_doc_comment)]
        address: u16,
        /// Data length in bytes.
        #[arg(value_parser = parse_length)]
        length: u16,
        /// The data, byte values separated by comma or blank (e.g. "6,30").
        /// With `--raw` the hex encoded data field as sent (e.g. "061E").
        #[arg(verbatim_doc_comment)]
        data: String,
        /// Send the data verbatim as hex encoded data field.
        #[arg(long)]
        raw: bool,
        /// Don't ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

const fn about_text() -> &'static str {
    "Rocket R 60V CLI - Remote control the Rocket R 60V espresso machine via TCP."
}

#[derive(Parser, Debug)]
#[command(name = "rocketctl", author, version, about = about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warnings.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Write the log into this file instead of stderr.
    #[arg(global = true, short = 'f', long)]
    pub logfile: Option<PathBuf>,

    /// YAML configuration file with the connection settings.
    /// Command line options take precedence over the file.
    #[arg(global = true, short, long, verbatim_doc_comment)]
    pub config: Option<PathBuf>,

    /// Host name or IP address of the machine [default: 192.168.1.1].
    #[arg(global = true, long)]
    pub host: Option<String>,

    /// TCP port of the machine [default: 1774].
    #[arg(global = true, short, long)]
    pub port: Option<u16>,

    /// Timeout for connecting and for every request attempt [default: 3s].
    /// Examples: "3s", "500ms".
    #[arg(global = true, long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Option<Duration>,

    /// Number of attempts per request when the machine doesn't answer in time [default: 3].
    #[arg(global = true, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    #[command(subcommand)]
    pub command: CliCommands,
}
