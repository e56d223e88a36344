use anyhow::Context;
use rocket_r60v_lib::transport::ConnectionConfig;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use crate::commandline::CliArgs;

/// Contents of the YAML configuration file.
///
/// ```yaml
/// connection:
///   host: 192.168.1.1
///   port: 1774
///   timeout: 3s
///   retries: 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        log::debug!("Loading config file from {path:?}");
        let config_file =
            File::open(path).with_context(|| format!("Cannot open config file {path:?}"))?;
        let config: Config = serde_yaml::from_reader(&config_file)
            .with_context(|| format!("Cannot parse config file {path:?}"))?;
        Ok(config)
    }
}

/// The connection settings: defaults, overridden by the config file,
/// overridden by the command line.
pub fn connection_config(args: &CliArgs) -> anyhow::Result<ConnectionConfig> {
    let mut connection = match &args.config {
        Some(path) => Config::load(path)?.connection,
        None => ConnectionConfig::default(),
    };
    if let Some(host) = &args.host {
        connection.host.clone_from(host);
    }
    if let Some(port) = args.port {
        connection.port = port;
    }
    if let Some(timeout) = args.timeout {
        connection.timeout = timeout;
    }
    if let Some(retries) = args.retries {
        connection.retries = retries;
    }
    Ok(connection)
}
