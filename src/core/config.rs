use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Default TCP port of ZK terminals
pub const DEFAULT_PORT: u16 = 4370;

/// Upper bound on the per-invocation timeout
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the single device targeted by one invocation.
///
/// Built from positional command-line arguments; nothing is read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    /// Numeric comm key configured on the terminal (0 when unset)
    pub password: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

/// Device passwords arrive as free text. The literal `None`, an empty
/// value or anything non-numeric means "no password".
pub fn parse_device_password(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw == "None" || raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }

    raw.parse::<u32>().unwrap_or(0)
}

impl DeviceConfig {
    /// Parse raw positional arguments and validate the result
    pub fn from_raw(host: &str, port: &str, password: &str, timeout: &str) -> Result<Self> {
        let port = port
            .trim()
            .parse::<u16>()
            .context(format!("Port must be an integer between 1 and 65535, got '{}'", port))?;

        let timeout_secs = timeout
            .trim()
            .parse::<u64>()
            .context(format!("Timeout must be a whole number of seconds, got '{}'", timeout))?;

        let config = Self {
            host: host.trim().to_string(),
            port,
            password: parse_device_password(password),
            timeout: Duration::from_secs(timeout_secs),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Device host must not be empty");
        }

        if self.host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            bail!("Device host '{}' contains whitespace or control characters", self.host);
        }

        if self.port == 0 {
            bail!("Device port must be greater than 0");
        }

        if self.timeout.is_zero() {
            bail!("Timeout must be greater than 0 seconds");
        }

        if self.timeout.as_secs() > MAX_TIMEOUT_SECS {
            bail!(
                "Timeout ({}s) must not exceed {}s",
                self.timeout.as_secs(),
                MAX_TIMEOUT_SECS
            );
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn new(level: &str, format: &str) -> Result<Self> {
        let config = Self {
            level: level.trim().to_ascii_lowercase(),
            format: format.trim().to_ascii_lowercase(),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.format
            );
        }

        Ok(())
    }
}
