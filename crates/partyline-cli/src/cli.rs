//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Talk to a bot's party-line console.
#[derive(Parser, Debug)]
#[command(name = "partyline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// YAML file with connection settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bot hostname or address
    #[arg(long)]
    pub host: Option<String>,

    /// Party-line port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Handle to log in with
    #[arg(long)]
    pub handle: Option<String>,

    /// Password for the handle
    #[arg(long, env = "PARTYLINE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run a catalogue operation (see `operations`)
    Exec {
        /// Operation name, e.g. add_channel or add-channel
        operation: String,

        /// Operation arguments, in order
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Send an arbitrary console command
    Raw {
        /// Command token, e.g. .whom
        token: String,

        /// Arguments, joined with single spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List the operation catalogue
    #[command(alias = "ls")]
    Operations,

    /// Log in and report success
    Ping,
}

impl Cli {
    /// Default log filter for the verbosity count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
