//! Config file loading and flag overrides.
//!
//! ```yaml
//! host: bot.example.net
//! port: 3333
//! handle: admin
//! timeouts:
//!   connect_ms: 5000
//!   response_ms: 10000
//! prompts:
//!   handle: "please enter your nickname"
//! ```
//!
//! Every field is optional in the file; flags win over the file and the
//! password may also come from `PARTYLINE_PASSWORD`.

use std::path::Path;

use partyline_client::{ConnectionConfig, PromptPatterns, Timeouts};
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::CliError;

/// Port used when neither the file nor the flags name one.
pub const DEFAULT_PORT: u16 = 3333;

/// Contents of a `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub handle: Option<String>,
    pub password: Option<String>,
    pub timeouts: Timeouts,
    pub prompts: PromptPatterns,
}

impl FileConfig {
    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<FileConfig, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse YAML config text.
    pub fn parse(text: &str) -> Result<FileConfig, CliError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply flag overrides and build the client config.
    pub fn resolve(self, cli: &Cli) -> Result<ConnectionConfig, CliError> {
        let host = cli
            .host
            .clone()
            .or(self.host)
            .ok_or(CliError::MissingSetting("host"))?;
        let handle = cli
            .handle
            .clone()
            .or(self.handle)
            .ok_or(CliError::MissingSetting("handle"))?;
        let password = cli
            .password
            .clone()
            .or(self.password)
            .ok_or(CliError::MissingSetting("password"))?;
        let port = cli.port.or(self.port).unwrap_or(DEFAULT_PORT);

        Ok(ConnectionConfig::new(host, port, handle, password)
            .with_timeouts(self.timeouts)
            .with_prompts(self.prompts))
    }
}

/// Load the file named by `--config`, if any, and apply the flags.
pub fn connection_config(cli: &Cli) -> Result<ConnectionConfig, CliError> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    file.resolve(cli)
}
