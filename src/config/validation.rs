//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Keyword accepted in place of a session duration to run without limit.
pub const FOREVER: &str = "forever";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a positive duration string using humantime.
///
/// Supports `500ms`, `1s`, `5m30s`, `1h`, `2h 30m`, `1d` and so on.
///
/// # Examples
///
/// ```
/// use connwatch::config::parse_duration;
///
/// assert_eq!(parse_duration("1s").unwrap().as_secs(), 1);
/// assert_eq!(parse_duration("1h30m").unwrap().as_secs(), 5400);
/// assert!(parse_duration("0s").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("duration must be positive".to_string());
    }
    Ok(duration)
}

/// Parse a session length: a positive duration, or `forever` for `None`.
///
/// ```
/// use connwatch::config::parse_session_duration;
///
/// assert_eq!(parse_session_duration("3s").unwrap().unwrap().as_secs(), 3);
/// assert_eq!(parse_session_duration("forever").unwrap(), None);
/// ```
pub fn parse_session_duration(s: &str) -> Result<Option<Duration>, String> {
    if s.trim().eq_ignore_ascii_case(FOREVER) {
        return Ok(None);
    }
    parse_duration(s).map(Some)
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("0s").is_err());
    }

    #[test]
    fn test_parse_session_duration() {
        assert_eq!(
            parse_session_duration("1h").unwrap(),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(parse_session_duration("forever").unwrap(), None);
        assert_eq!(parse_session_duration("FOREVER").unwrap(), None);
        assert!(parse_session_duration("never").is_err());
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("logs/connectivity.txt"), "logs/connectivity.txt");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let result = expand_env_vars("${CONNWATCH_TEST_MISSING_DIR_12345:-/tmp}/log.txt");
        assert_eq!(result, "/tmp/log.txt");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: This test runs in isolation and only modifies a test-specific variable.
        unsafe {
            std::env::set_var("CONNWATCH_TEST_LOG_DIR", "/var/log/connwatch");
        }
        let result = expand_env_vars("${CONNWATCH_TEST_LOG_DIR}/session.txt");
        assert_eq!(result, "/var/log/connwatch/session.txt");
        // SAFETY: Cleanup test variable.
        unsafe {
            std::env::remove_var("CONNWATCH_TEST_LOG_DIR");
        }
    }
}
