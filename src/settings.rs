//! Layered settings for the CLI and the API server.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `insights.toml` in the working directory (optional), or the file passed
//!    with `--config` (required)
//! 3. environment variables such as `INSIGHTS__REPORT__SENDER`
use crate::aggregator::DEFAULT_TOP_N;
use crate::report::ReportOptions;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAME: &str = "insights";
const ENV_PREFIX: &str = "INSIGHTS";
const DEFAULT_INPUT_PATH: &str = "data/transactions.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Input {
    /// Dataset file, `.json` or `.csv`
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    /// `tracing` filter directive, e.g. `info` or `transaction_insights=debug`
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub input: Input,
    pub report: ReportOptions,
    pub log: Log,
    pub server: Server,
}

impl Settings {
    pub fn new(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(
            config_file,
            // Values stay strings; serde coerces numeric keys such as `report.top_n`
            Environment::with_prefix(ENV_PREFIX).separator("__"),
        )
    }

    fn from_sources(config_file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = ReportOptions::default();

        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .set_default("input.path", DEFAULT_INPUT_PATH)?
            .set_default("report.sender", defaults.sender)?
            .set_default("report.client", defaults.client)?
            .set_default("report.top_n", DEFAULT_TOP_N as i64)?
            .set_default("log.level", "info")?
            .set_default("server.bind", "0.0.0.0:3000")?
            .add_source(file)
            .add_source(env)
            .build()?;

        settings.try_deserialize()
    }
}
