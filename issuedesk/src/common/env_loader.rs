//! Environment variable loading utilities
//!
//! Typed lookups with fallback defaults, scoped under a common prefix so every
//! setting reads as `ISSUEDESK_<NAME>`.

use std::env;
use std::str::FromStr;

/// Load an environment variable with a string default
pub fn load_env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable with type conversion and default
pub fn load_env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Load an environment variable as an Option<T>
pub fn load_env_optional<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Load a boolean flag; accepts `1/0`, `true/false`, `yes/no`, `on/off`
pub fn load_env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Builder for loading multiple environment variables with consistent prefix
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Load a string value with default
    pub fn load_string(&self, suffix: &str, default: &str) -> String {
        load_env_string(&self.key(suffix), default)
    }

    /// Load a parsed value with default
    pub fn load_parsed<T>(&self, suffix: &str, default: T) -> T
    where
        T: FromStr,
    {
        load_env_parsed(&self.key(suffix), default)
    }

    /// Load an optional value
    pub fn load_optional<T>(&self, suffix: &str) -> Option<T>
    where
        T: FromStr,
    {
        load_env_optional(&self.key(suffix))
    }

    /// Load a boolean flag with default
    pub fn load_flag(&self, suffix: &str, default: bool) -> bool {
        load_env_flag(&self.key(suffix), default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_env_parsed() {
        let key = "ISSUEDESK_TEST_PARSED_VAR";

        env::remove_var(key);
        assert_eq!(load_env_parsed(key, 42u32), 42);

        env::set_var(key, "123");
        assert_eq!(load_env_parsed::<u32>(key, 42), 123);

        // Unparseable values fall back to the default
        env::set_var(key, "invalid");
        assert_eq!(load_env_parsed(key, 42u32), 42);

        env::remove_var(key);
    }

    #[test]
    #[serial]
    fn test_load_env_flag() {
        let key = "ISSUEDESK_TEST_FLAG_VAR";

        env::remove_var(key);
        assert!(!load_env_flag(key, false));

        for truthy in ["1", "true", "YES", "On"] {
            env::set_var(key, truthy);
            assert!(load_env_flag(key, false), "{} should be true", truthy);
        }

        env::set_var(key, "off");
        assert!(!load_env_flag(key, true));

        env::set_var(key, "maybe");
        assert!(load_env_flag(key, true));

        env::remove_var(key);
    }

    #[test]
    #[serial]
    fn test_env_loader_prefix() {
        let loader = EnvLoader::new("ISSUEDESK_TEST");

        env::remove_var("ISSUEDESK_TEST_STRING");
        assert_eq!(loader.load_string("STRING", "default"), "default");
        env::set_var("ISSUEDESK_TEST_STRING", "value");
        assert_eq!(loader.load_string("STRING", "default"), "value");

        env::remove_var("ISSUEDESK_TEST_NUMBER");
        assert_eq!(loader.load_optional::<u32>("NUMBER"), None);
        env::set_var("ISSUEDESK_TEST_NUMBER", "456");
        assert_eq!(loader.load_optional::<u32>("NUMBER"), Some(456));

        env::remove_var("ISSUEDESK_TEST_STRING");
        env::remove_var("ISSUEDESK_TEST_NUMBER");
    }
}
