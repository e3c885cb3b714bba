//! # Configuration
//!
//! Logging settings gathered from the environment, with command-line
//! overrides applied on top.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `debug`, `kinfo_core=trace`)
//! - `KINFO_LOG_FORMAT`: `pretty` (default) or `json`
//! - `KINFO_LOG_FILE`: optional path of a log file, rotated daily

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::logging::{LogFormat, LogLevel, LoggingError};

pub const ENV_LOG_FORMAT: &str = "KINFO_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "KINFO_LOG_FILE";
pub const ENV_RUST_LOG: &str = "RUST_LOG";

/// Everything needed to build the tracing subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig
{
    pub format: LogFormat,
    /// Level forced by the command line; beats `filter`
    pub level: Option<LogLevel>,
    /// Raw `RUST_LOG` directives
    pub filter: Option<String>,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig
{
    fn default() -> Self
    {
        Self {
            format: LogFormat::Pretty,
            level: None,
            filter: None,
            file: None,
        }
    }
}

impl LogConfig
{
    /// Read the configuration from the process environment
    ///
    /// ## Errors
    ///
    /// `InvalidFormat` if `KINFO_LOG_FORMAT` names an unknown format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`], reading variables through `lookup`
    ///
    /// ```rust
    /// use kinfo_utils::{LogConfig, LogFormat};
    ///
    /// let config = LogConfig::from_lookup(|key| match key {
    ///     "KINFO_LOG_FORMAT" => Some("json".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.format, LogFormat::Json);
    /// assert!(config.file.is_none());
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError>
    {
        let format = match lookup(ENV_LOG_FORMAT) {
            Some(value) if !value.is_empty() => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
            _ => LogFormat::Pretty,
        };
        Ok(Self {
            format,
            level: None,
            filter: lookup(ENV_RUST_LOG).filter(|value| !value.is_empty()),
            file: lookup(ENV_LOG_FILE).filter(|value| !value.is_empty()).map(PathBuf::from),
        })
    }

    /// Apply a `--log-level` flag
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Filter directives in effect: the forced level, else `RUST_LOG`, else
    /// `warn`
    pub fn directives(&self) -> String
    {
        match (self.level, &self.filter) {
            (Some(level), _) => level.as_str().to_string(),
            (None, Some(filter)) => filter.clone(),
            (None, None) => LogLevel::Warn.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults()
    {
        let config = LogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.directives(), "warn");
    }

    #[test]
    fn test_reads_all_variables()
    {
        let config = LogConfig::from_lookup(lookup(&[
            ("KINFO_LOG_FORMAT", "json"),
            ("KINFO_LOG_FILE", "/var/log/kinfo.log"),
            ("RUST_LOG", "kinfo_core=debug"),
        ]))
        .unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/var/log/kinfo.log")));
        assert_eq!(config.directives(), "kinfo_core=debug");
    }

    #[test]
    fn test_flag_overrides_rust_log()
    {
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "trace")]))
            .unwrap()
            .with_level(Some(LogLevel::Error));
        assert_eq!(config.directives(), "error");

        let config = config.with_level(None);
        assert_eq!(config.level, Some(LogLevel::Error));
    }

    #[test]
    fn test_bad_format_is_rejected()
    {
        let err = LogConfig::from_lookup(lookup(&[("KINFO_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFormat(_)));
    }
}
