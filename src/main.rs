mod address;
mod cli;
mod config;
mod record;
mod sender;
mod shutdown;
mod telemetry;
mod transport;

use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::cli::{Args, Settings};
use crate::config::{Config, DEFAULT_LOG_LEVEL};
use crate::sender::{Outcome, Sender};
use crate::transport::{Connection, Discard, Transport};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // The log level lives in the config, so the config is read before logging is up and
    // any error loading it is reported right after.
    let config = Config::load();
    let log_level = config
        .as_ref()
        .map(|config| config.log_level.as_str())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    if let Err(err) = telemetry::init_tracing(log_level) {
        eprintln!("Error setting up logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: anyhow::Result<Config>) -> anyhow::Result<ExitCode> {
    // The arguments are parsed before any config error is raised, so --help and --version
    // still work with a bad SWAMPIT_* value in the environment.
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version arrive as errors too, but they print to stdout and succeed.
        Err(err) if !err.use_stderr() => {
            err.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => return Err(anyhow!(cli::usage_error(&err))),
    };
    let config = config.context("Error loading config")?;
    let settings = Settings::new(args, &config)?;

    // The cancellation token is the only state shared between the sender and the signal
    // listener. The listener cancels it on Ctrl-C or SIGTERM, and the sender checks it
    // between records and races it against every write and every interval wait, so a
    // signal never has to wait for a long interval to elapse before the process exits.
    let cancel = CancellationToken::new();
    shutdown::listen(cancel.clone());
    let rng = StdRng::from_os_rng();

    // In a dry run nothing is dialed at all: the Discard sink accounts every record as
    // written, so the logs and byte counts look exactly like a live run.
    let outcome = if settings.dry_run {
        Sender::new(settings, Discard, rng, cancel).run().await?
    } else {
        let connection = connect(&settings).await?;
        Sender::new(settings, connection, rng, cancel).run().await?
    };

    match outcome {
        Outcome::Completed(summary) => {
            tracing::debug!("{}", summary);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Interrupted(summary) => {
            tracing::info!("Interrupted, exiting. {}", summary);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<Connection> {
    let target = settings
        .target
        .as_ref()
        .context("Could not connect: missing target address")?;
    let transport: Transport = settings
        .protocol
        .parse()
        .context("Could not connect")?;
    transport
        .connect(target)
        .await
        .with_context(|| format!("Could not connect to {target}"))
}
