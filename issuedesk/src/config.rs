//! Configuration management for issuedesk
//!
//! Settings are resolved in layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. `ISSUEDESK_*` environment variables
//! 3. An `issuedesk.yaml` file
//!
//! Command-line flags are applied on top by the CLI.

use crate::common::env_loader::EnvLoader;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const CONFIG_FILENAME: &str = "issuedesk.yaml";
const DEFAULT_DATABASE_PATH: &str = "issuedesk.json";
const MIN_ISSUE_NUMBER_PADDING: usize = 1;
const MAX_ISSUE_NUMBER_PADDING: usize = 10;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field
        field: String,
        /// The invalid value that was provided
        value: String,
        /// How to fix it
        hint: String,
    },
}

/// Named configuration profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development against a file-backed store
    #[default]
    Development,
    /// Tests; records live only in memory
    Testing,
    /// Containerised deployment
    Docker,
    /// Production deployment
    Production,
}

impl Environment {
    /// All profiles, in display order
    pub const ALL: [Environment; 4] = [
        Environment::Development,
        Environment::Testing,
        Environment::Docker,
        Environment::Production,
    ];

    /// Lower-case profile name
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Docker => "docker",
            Environment::Production => "production",
        }
    }

    /// Whether this profile keeps records in memory only
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Environment::Testing)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                hint: "Use one of: development, testing, docker, production".to_string(),
            })
    }
}

/// Configuration settings for issuedesk
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Active profile (default: development)
    pub environment: Environment,
    /// Zero-padding width of the numeric part of issue names (default: 4)
    pub issue_number_padding: usize,
    /// Largest sequence number a project may allocate (default: 99_999_999)
    pub max_issue_number: u64,
    /// Location of the JSON record store (default: issuedesk.json)
    pub database_path: PathBuf,
    /// Log filter directive (default: info)
    pub log_level: String,
    /// Optional file that receives a copy of the log output
    pub log_file: Option<PathBuf>,
    /// Accept ASSIGNMENT/STATUS/RESOLUTION activity types (default: false)
    pub extended_activity_types: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            issue_number_padding: 4,
            max_issue_number: 99_999_999,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_level: "info".to_string(),
            log_file: None,
            extended_activity_types: false,
        }
    }
}

impl Config {
    /// Create a new configuration instance with values loaded from:
    /// 1. YAML file (highest precedence)
    /// 2. Environment variables
    /// 3. Defaults (lowest precedence)
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_vars();

        match YamlConfig::load_or_default() {
            Ok(yaml_config) => {
                yaml_config.apply_to_config(&mut config);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load YAML configuration, falling back to env vars and defaults: {}",
                    e
                );
            }
        }

        config
    }

    /// Start from the defaults of a profile, then layer env vars and YAML on top
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::new();
        config.environment = environment;
        config
    }

    /// Apply environment variable configuration to this config
    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new("ISSUEDESK");

        if let Some(environment) = loader.load_optional::<String>("ENV") {
            match environment.parse() {
                Ok(environment) => self.environment = environment,
                Err(e) => tracing::warn!("Ignoring ISSUEDESK_ENV: {}", e),
            }
        }
        self.issue_number_padding =
            loader.load_parsed("ISSUE_NUMBER_PADDING", self.issue_number_padding);
        self.max_issue_number = loader.load_parsed("MAX_ISSUE_NUMBER", self.max_issue_number);
        if let Some(path) = loader.load_optional::<PathBuf>("DATABASE_PATH") {
            self.database_path = path;
        }
        self.log_level = loader.load_string("LOG_LEVEL", &self.log_level);
        if let Some(path) = loader.load_optional::<PathBuf>("LOG_FILE") {
            self.log_file = Some(path);
        }
        self.extended_activity_types =
            loader.load_flag("EXTENDED_ACTIVITY_TYPES", self.extended_activity_types);
    }

    /// Find the issuedesk.yaml configuration file
    ///
    /// Search order:
    /// 1. Current working directory: `issuedesk.yaml`
    /// 2. `~/.config/issuedesk/issuedesk.yaml`
    /// 3. `~/issuedesk.yaml`
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(CONFIG_FILENAME)];

        if let Some(home_dir) = dirs::home_dir() {
            search_paths.push(
                home_dir
                    .join(".config")
                    .join("issuedesk")
                    .join(CONFIG_FILENAME),
            );
            search_paths.push(home_dir.join(CONFIG_FILENAME));
        }

        for config_path in search_paths {
            if let Some(path) = Self::check_config_file(&config_path) {
                tracing::debug!("Found configuration file: {:?}", path);
                return Some(path);
            }
        }

        tracing::debug!("No issuedesk.yaml configuration file found in any search location");
        None
    }

    /// Check if a configuration file exists and is readable
    pub fn check_config_file(config_path: &Path) -> Option<PathBuf> {
        match config_path.try_exists() {
            Ok(true) if config_path.is_file() => match std::fs::File::open(config_path) {
                Ok(_) => Some(config_path.to_path_buf()),
                Err(e) => {
                    tracing::warn!(
                        "Configuration file {:?} exists but cannot be read: {}",
                        config_path,
                        e
                    );
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    "Error checking for configuration file {:?}: {}",
                    config_path,
                    e
                );
                None
            }
        }
    }

    /// Validate the current configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issue_number_padding < MIN_ISSUE_NUMBER_PADDING
            || self.issue_number_padding > MAX_ISSUE_NUMBER_PADDING
        {
            return Err(ConfigError::InvalidValue {
                field: "issue_number_padding".to_string(),
                value: self.issue_number_padding.to_string(),
                hint: format!(
                    "issue_number_padding must be between {} and {}",
                    MIN_ISSUE_NUMBER_PADDING, MAX_ISSUE_NUMBER_PADDING
                ),
            });
        }

        if self.max_issue_number == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_issue_number".to_string(),
                value: self.max_issue_number.to_string(),
                hint: "max_issue_number must be positive".to_string(),
            });
        }

        if self.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                value: self.log_level.clone(),
                hint: "log_level cannot be empty; try 'info' or 'debug'".to_string(),
            });
        }

        if !self.environment.is_in_memory() && self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database_path".to_string(),
                value: String::new(),
                hint: "database_path is required outside the testing profile".to_string(),
            });
        }

        Ok(())
    }

    /// Settings as `(parameter, value)` pairs, for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("environment", self.environment.to_string()),
            ("issue_number_padding", self.issue_number_padding.to_string()),
            ("max_issue_number", self.max_issue_number.to_string()),
            ("database_path", self.database_path.display().to_string()),
            ("log_level", self.log_level.clone()),
            (
                "log_file",
                self.log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            (
                "extended_activity_types",
                self.extended_activity_types.to_string(),
            ),
        ]
    }

    /// Generate an example YAML configuration file content
    pub fn example_yaml_config() -> &'static str {
        r#"# issuedesk.yaml
environment: development
issue_number_padding: 4
database_path: "issuedesk.json"
log_level: info
extended_activity_types: false
"#
    }
}

/// Configuration loaded from issuedesk.yaml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YamlConfig {
    /// Active profile
    pub environment: Option<Environment>,
    /// Zero-padding width of issue numbers
    pub issue_number_padding: Option<usize>,
    /// Largest allocatable sequence number
    pub max_issue_number: Option<u64>,
    /// Location of the JSON record store
    pub database_path: Option<PathBuf>,
    /// Log filter directive
    pub log_level: Option<String>,
    /// Log file path
    pub log_file: Option<PathBuf>,
    /// Accept the extended activity types
    pub extended_activity_types: Option<bool>,
}

impl YamlConfig {
    /// Apply YAML configuration values to an existing Config
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        if let Some(padding) = self.issue_number_padding {
            config.issue_number_padding = padding;
        }
        if let Some(max) = self.max_issue_number {
            config.max_issue_number = max;
        }
        if let Some(ref path) = self.database_path {
            config.database_path = path.clone();
        }
        if let Some(ref level) = self.log_level {
            config.log_level = level.clone();
        }
        if let Some(ref path) = self.log_file {
            config.log_file = Some(path.clone());
        }
        if let Some(extended) = self.extended_activity_types {
            config.extended_activity_types = extended;
        }
    }

    /// Load YAML configuration from a file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Try to load YAML configuration, returning default if file not found
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Config::find_yaml_config_file() {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
