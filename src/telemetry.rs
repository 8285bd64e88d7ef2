use std::io::IsTerminal as _;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Sets up logging: errors go to stderr, everything else to stdout, each line prefixed
/// with a timestamp and its level. `RUST_LOG` takes precedence over `log_level`.
pub fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let directive = log_level
        .parse::<LevelFilter>()
        .with_context(|| format!("invalid log level '{log_level}'"))?;

    let writer = std::io::stderr
        .with_max_level(Level::ERROR)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(directive.into())
                .from_env_lossy(),
        )
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}
