use std::path::PathBuf;

use partyline_client::{CommandError, ConnectionError, ProtocolError};
use thiserror::Error;

/// Errors surfaced by the `partyline` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON encoding error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("missing {0}: pass --{0} or set it in the config file")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Command(#[from] CommandError),
}
