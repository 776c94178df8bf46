//! partyline - command-line client for a bot's party-line console.

use std::process::ExitCode;

use clap::Parser;
use partyline_cli::{run, Cli};
use partyline_client::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins unless -v was given
    let filter = match (cli.verbose, EnvFilter::try_from_default_env()) {
        (0, Ok(filter)) => filter,
        _ => EnvFilter::new(cli.log_filter()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    partyline_metrics::describe_metrics();

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let result = run(&cli, cancel).await;
    interrupt.abort();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
