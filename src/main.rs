//! Rocket R 60V CLI
//!
//! A command-line interface (CLI) application for remote controlling the
//! Rocket R 60V espresso machine via TCP.
//!
//! This tool allows users to:
//! - Read any known setting, e.g. boiler temperatures, pressure profiles or the display.
//! - Write settings like the language, boiler temperatures, timers or the clock.
//! - List all known settings with their memory addresses.
//! - Read and write raw memory locations for debugging.
//!
//! The CLI leverages the `rocket_r60v_lib` crate for protocol definitions and client operations.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use flexi_logger::{FileSpec, Logger, LoggerHandle};
use log::*;
use rocket_r60v_lib::{client::Machine, client::RawData, protocol as proto, registry};
use std::panic;
use std::path::Path;

mod commandline;
mod config;

fn logging_init(loglevel: LevelFilter, logfile: Option<&Path>) -> Result<LoggerHandle> {
    let mut logger =
        Logger::try_with_env_or_str(loglevel.as_str()).context("Cannot init logging")?;
    if let Some(logfile) = logfile {
        logger = logger
            .log_to_file(FileSpec::try_from(logfile).context("Invalid log file name")?)
            .append();
    }
    let log_handle = logger.start().context("Cannot start logging")?;

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    Ok(log_handle)
}

/// Prints the address table, no connection needed.
fn print_addresses() -> Result<()> {
    println!("{:>5}  {:>6}  {:>3}  name", "addr", "hex", "len");
    for entry in registry::addresses() {
        let setting = registry::find(entry.name)?;
        println!("{entry}  ({})\n{:>20}{}", setting.kind, "", setting.description);
    }
    Ok(())
}

/// Asks before writing unchecked data into the machine memory.
fn confirm_raw_write(address: u16, length: u16, data: &str) -> Result<bool> {
    println!(
        "WARNING: Writing raw data bypasses all validation. \
         Invalid data may put the machine into an undefined state."
    );
    Confirm::new()
        .with_prompt(format!(
            "Write \"{data}\" ({length} byte(s)) to address {address} ({address:#06X})?"
        ))
        .default(false)
        .show_default(true)
        .interact()
        .context("Failed to get user confirmation.")
}

fn execute(machine: &mut Machine, command: &commandline::CliCommands) -> Result<()> {
    match command {
        commandline::CliCommands::Get { setting } => {
            info!("Executing: Get {setting}");
            let value = machine
                .get(setting)
                .with_context(|| format!("Cannot read {setting}"))?;
            println!("{value}");
        }
        commandline::CliCommands::Set { setting, value } => {
            info!("Executing: Set {setting} to \"{value}\"");
            let result = machine
                .set(setting, value)
                .with_context(|| format!("Cannot set {setting} to \"{value}\""))?;
            println!("{result}");
        }
        commandline::CliCommands::ReadRaw { address, length } => {
            info!("Executing: Read {length} raw byte(s) at {address:#06X}");
            let payload = machine
                .read_raw(*address, *length)
                .with_context(|| format!("Cannot read address {address:#06X}"))?;
            println!("{payload}");
        }
        commandline::CliCommands::WriteRaw {
            address,
            length,
            data,
            raw,
            ..
        } => {
            info!("Executing: Write raw \"{data}\" at {address:#06X}");
            let data = if *raw {
                RawData::Hex(data.clone())
            } else {
                RawData::Bytes(proto::parse_data(data)?)
            };
            let payload = machine
                .write_raw(*address, *length, &data)
                .with_context(|| format!("Cannot write address {address:#06X}"))?;
            println!("{payload}");
        }
        commandline::CliCommands::List => unreachable!("List is handled without a connection."),
    }
    Ok(())
}

fn run(args: &commandline::CliArgs) -> Result<()> {
    if args.command == commandline::CliCommands::List {
        return print_addresses();
    }

    if let commandline::CliCommands::WriteRaw {
        address,
        length,
        data,
        yes: false,
        ..
    } = &args.command
    {
        if !confirm_raw_write(*address, *length, data)? {
            info!("Raw write aborted by user.");
            return Ok(());
        }
    }

    let connection = config::connection_config(args)?;
    info!("Attempting to connect via TCP to {}...", connection.address());
    let mut machine = Machine::connect(&connection)?;

    let result = execute(&mut machine, &args.command);
    if let Err(error) = machine.disconnect() {
        warn!("Cannot close the connection: {error}");
    }
    result
}

/// The domain error behind `error`, looking through any added context.
/// `None` for I/O faults and errors of the CLI itself.
fn domain_error(error: &anyhow::Error) -> Option<&rocket_r60v_lib::Error> {
    error
        .downcast_ref::<rocket_r60v_lib::Error>()
        .filter(|domain| domain.is_domain())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter(), args.logfile.as_deref())?;
    info!(
        "Rocket R 60V CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    if let Err(error) = run(&args) {
        // Domain errors are expected failures: one line, exit code 1.
        if let Some(domain) = domain_error(&error) {
            debug!("{error:?}");
            eprintln!("Error: {domain}");
            std::process::exit(1);
        }
        return Err(error);
    }
    Ok(())
}
