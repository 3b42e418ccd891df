//! Agent configuration, read once at startup from a JSON document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error loading or validating the configuration document.
#[derive(Debug)]
pub enum ConfigError {
    /// The document could not be read.
    Io { path: PathBuf, source: io::Error },
    /// The document is not valid JSON for [`Config`].
    Parse(serde_json::Error),
    /// A field value is out of range.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "malformed config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Agent configuration.
///
/// Wire keys are camelCase; absent keys fall back to the defaults.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Cron expression driving the sampling schedule, seconds field first
    /// (`0 * * * * *` = every minute at second zero).
    pub cron_expression: String,
    /// Path of the output log file. Created or truncated at startup.
    pub output_path: String,
    /// How many shutdown checks happen per schedule interval. Higher values
    /// shorten worst-case shutdown latency; sampling cadence is unaffected.
    pub timeout_divider: u32,
    /// Mirror agent status messages to stdout.
    pub stdout_messages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cron_expression: "0 * * * * *".to_string(),
            output_path: "memlog.json".to_string(),
            timeout_divider: 2,
            stdout_messages: false,
        }
    }
}

impl Config {
    /// Reads and validates a configuration document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field-level constraints the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cron_expression.trim().is_empty() {
            return Err(ConfigError::Invalid("cronExpression is empty".into()));
        }
        if self.output_path.trim().is_empty() {
            return Err(ConfigError::Invalid("outputPath is empty".into()));
        }
        if self.timeout_divider == 0 {
            return Err(ConfigError::Invalid(
                "timeoutDivider must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}
