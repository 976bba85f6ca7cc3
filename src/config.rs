use crate::error::{IptallyError, Result};
use crate::lens::analysis::DEFAULT_WINDOW_DATE_FORMAT;
use crate::lens::log::DEFAULT_LOG_DATETIME_FORMAT;
use crate::lens::utils::OutputFormat;
use config::Config;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub struct IptallyConfig {
    /// chrono layout of the date and time fields of a log line
    pub log_datetime_format: String,

    /// chrono layout of `--time-start` and `--time-end`
    pub window_date_format: String,

    /// Reject non-contiguous network masks
    pub strict_mask: bool,

    /// Output file format used when `--format` is not given
    pub output_format: OutputFormat,
}

impl Default for IptallyConfig {
    fn default() -> Self {
        Self {
            log_datetime_format: DEFAULT_LOG_DATETIME_FORMAT.to_string(),
            window_date_format: DEFAULT_WINDOW_DATE_FORMAT.to_string(),
            strict_mask: false,
            output_format: OutputFormat::default(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl IptallyConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Sources, lowest priority first: built-in defaults, the TOML file
    /// (`path`, or `$HOME/.iptally.toml` if it exists), then `IPTALLY_*`
    /// environment variables (a `.env` file in the working directory is
    /// loaded first).
    pub fn new(path: &Option<String>) -> Result<IptallyConfig> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        match path {
            Some(p) => {
                if !Path::new(p.as_str()).exists() {
                    return Err(IptallyError::Config(format!(
                        "config file {} does not exist",
                        p
                    )));
                }
                builder = builder.add_source(config::File::with_name(p.as_str()));
            }
            None => {
                if let Some(p) = Self::config_file_path() {
                    if Path::new(p.as_str()).exists() {
                        builder = builder.add_source(config::File::with_name(p.as_str()));
                    }
                }
            }
        }

        // E.g., `IPTALLY_STRICT_MASK=true iptally ...` enables strict masks
        builder = builder.add_source(config::Environment::with_prefix("IPTALLY"));

        let settings = builder
            .build()
            .map_err(|e| IptallyError::Config(format!("Failed to build configuration: {}", e)))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| {
                IptallyError::Config(format!("Failed to deserialize configuration: {}", e))
            })?;

        Self::from_map(&config)
    }

    fn from_map(config: &HashMap<String, String>) -> Result<IptallyConfig> {
        let defaults = IptallyConfig::default();

        let strict_mask = match config.get("strict_mask") {
            Some(v) => parse_bool(v).ok_or_else(|| {
                IptallyError::Config(format!("strict_mask must be a boolean, got {}", v))
            })?,
            None => defaults.strict_mask,
        };

        let output_format = match config.get("output_format") {
            Some(v) => OutputFormat::from_str(v).map_err(IptallyError::Config)?,
            None => defaults.output_format,
        };

        Ok(IptallyConfig {
            log_datetime_format: config
                .get("log_datetime_format")
                .cloned()
                .unwrap_or(defaults.log_datetime_format),
            window_date_format: config
                .get("window_date_format")
                .cloned()
                .unwrap_or(defaults.window_date_format),
            strict_mask,
            output_format,
        })
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Log Datetime Format: {}", self.log_datetime_format),
            format!("Window Date Format:  {}", self.window_date_format),
            format!("Strict Mask:         {}", self.strict_mask),
            format!("Output Format:       {}", self.output_format),
        ];
        lines.join("\n")
    }

    /// Get the default config file path
    pub fn config_file_path() -> Option<String> {
        dirs::home_dir().map(|h| format!("{}/.iptally.toml", h.to_string_lossy()))
    }
}
