use anyhow::Context;
use config::Config as CConfig;

const CONFIG_FILE: &str = "swampit.toml";
const CONFIG_PATH_VAR: &str = "SWAMPIT_CONFIG";
const ENV_PREFIX: &str = "SWAMPIT";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Defaults for a run, read before the command line is parsed. Flags given on the
/// command line always take precedence over these values.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub count: u64,
    pub interval: f64,
    pub size: usize,
    pub protocol: String,
    pub exit_on_write_error: bool,
}

impl Config {
    /// Loads `swampit.toml` from the working directory when present, or the file named by
    /// `SWAMPIT_CONFIG`, which must then exist. `SWAMPIT_*` variables override both.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::new(&path, true),
            Err(_) => Self::new(CONFIG_FILE, false),
        }
    }

    fn new(path: &str, required: bool) -> anyhow::Result<Self> {
        let c = CConfig::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Error reading config from {path}"))?;
        let config: Self = c.try_deserialize()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            count: 10,
            interval: 1.0,
            size: 32,
            protocol: "tcp".to_string(),
            exit_on_write_error: false,
        }
    }
}
