//! Library half of the `partyline` binary.
//!
//! Parses nothing itself: [`run`] takes the parsed [`Cli`], drives a
//! [`Controller`] and writes results to stdout.

pub mod cli;
pub mod config;
pub mod error;

use std::io::Write;

use partyline_client::{CancellationToken, Command, Controller, Operation};
use serde::Serialize;
use tracing::info;

pub use cli::{Cli, Commands};
pub use error::CliError;

/// One command and its reply, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct Exchange<'a> {
    pub token: &'a str,
    pub line: String,
    pub reply: &'a str,
}

/// One catalogue row, as printed with `--json`.
#[derive(Debug, Serialize)]
struct OperationRow {
    name: &'static str,
    token: &'static str,
    usage: String,
    summary: &'static str,
}

/// Run the selected subcommand.
pub async fn run(cli: &Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let mut out = std::io::stdout();

    if cli.command == Commands::Operations {
        return list_operations(&mut out, cli.json);
    }

    let config = config::connection_config(cli)?;
    info!(addr = %config.address(), handle = %config.handle, "using console");
    let mut controller = Controller::new(config).with_cancellation(cancel);

    match &cli.command {
        Commands::Exec { operation, args } => {
            let operation = Operation::from_name(operation)?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let command = operation.command(&args)?;
            exchange(&mut controller, &command, &mut out, cli.json).await
        }
        Commands::Raw { token, args } => {
            let command = Command::new(token, args.iter().map(String::as_str))?;
            exchange(&mut controller, &command, &mut out, cli.json).await
        }
        Commands::Ping => {
            controller.ensure_connected().await?;
            let config = controller.config();
            if cli.json {
                let status = serde_json::json!({
                    "address": config.address(),
                    "handle": config.handle,
                    "connected": true,
                });
                writeln!(out, "{}", serde_json::to_string(&status)?)?;
            } else {
                writeln!(out, "joined {} as {}", config.address(), config.handle)?;
            }
            controller.disconnect();
            Ok(())
        }
        Commands::Operations => Ok(()),
    }
}

async fn exchange(
    controller: &mut Controller,
    command: &Command,
    out: &mut impl Write,
    json: bool,
) -> Result<(), CliError> {
    let reply = controller.send_command(command).await?;
    if json {
        let exchange = Exchange {
            token: command.token(),
            line: command.to_command_string(),
            reply: &reply,
        };
        writeln!(out, "{}", serde_json::to_string(&exchange)?)?;
    } else {
        writeln!(out, "{}", reply)?;
    }
    controller.disconnect();
    Ok(())
}

fn list_operations(out: &mut impl Write, json: bool) -> Result<(), CliError> {
    if json {
        let rows: Vec<OperationRow> = Operation::ALL
            .iter()
            .map(|op| {
                let spec = op.spec();
                OperationRow {
                    name: spec.name,
                    token: spec.token,
                    usage: spec.usage(),
                    summary: spec.summary,
                }
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    for op in Operation::ALL {
        let spec = op.spec();
        writeln!(out, "{:<48} {:<10} {}", spec.usage(), spec.token, spec.summary)?;
    }
    Ok(())
}
