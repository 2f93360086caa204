//! Environment variable readers.
//!
//! Empty values are treated as unset so that `FOO=` in a `.env` file does not
//! override a default.

use std::env;
use std::str::FromStr;

/// Read a non-empty environment variable.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable.
///
/// Returns `Ok(None)` when unset, and an error naming the variable when the
/// value does not parse.
pub fn env_parse<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: '{raw}' ({e})").into()),
        None => Ok(None),
    }
}

/// Read a boolean environment variable.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
pub fn env_bool(key: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    match env_string(key) {
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| format!("Invalid boolean for {key}: '{raw}'").into()),
        None => Ok(None),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_env_string_empty_is_unset() {
        unsafe {
            env::set_var("GATEWAY_TEST_EMPTY", "  ");
        }
        assert_eq!(env_string("GATEWAY_TEST_EMPTY"), None);
        unsafe {
            env::remove_var("GATEWAY_TEST_EMPTY");
        }
    }

    #[test]
    #[serial]
    fn test_env_parse() {
        unsafe {
            env::set_var("GATEWAY_TEST_PORT", "8123");
        }
        assert_eq!(env_parse::<u16>("GATEWAY_TEST_PORT").unwrap(), Some(8123));

        unsafe {
            env::set_var("GATEWAY_TEST_PORT", "not-a-port");
        }
        let err = env_parse::<u16>("GATEWAY_TEST_PORT").unwrap_err();
        assert!(err.to_string().contains("Invalid value for GATEWAY_TEST_PORT"));

        unsafe {
            env::remove_var("GATEWAY_TEST_PORT");
        }
        assert_eq!(env_parse::<u16>("GATEWAY_TEST_PORT").unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_env_bool() {
        unsafe {
            env::set_var("GATEWAY_TEST_FLAG", "nah");
        }
        assert!(env_bool("GATEWAY_TEST_FLAG").is_err());
        unsafe {
            env::set_var("GATEWAY_TEST_FLAG", "false");
        }
        assert_eq!(env_bool("GATEWAY_TEST_FLAG").unwrap(), Some(false));
        unsafe {
            env::remove_var("GATEWAY_TEST_FLAG");
        }
    }
}
