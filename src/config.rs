//! Job configuration, read once at startup from a YAML file.
//!
//! The file path comes from the `CONFIG_FILE_PATH` environment variable.
//! Database credentials can be overridden through dedicated environment
//! variables so the config file does not have to contain secrets.

use std::{env, fs};

use serde::Deserialize;

use crate::{error::MigrationError, ident, migration::transform::AddressPolicy};

pub const ENV_CONFIG_FILE_PATH: &str = "CONFIG_FILE_PATH";

// Variables to override secrets in the config file
pub const ENV_STUDY_DB_USERNAME: &str = "STUDY_DB_USERNAME";
pub const ENV_STUDY_DB_PASSWORD: &str = "STUDY_DB_PASSWORD";
pub const ENV_PARTICIPANT_USER_DB_USERNAME: &str = "PARTICIPANT_USER_DB_USERNAME";
pub const ENV_PARTICIPANT_USER_DB_PASSWORD: &str = "PARTICIPANT_USER_DB_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connection settings for one MongoDB deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub connection_str: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfigs {
    pub participant_user_db: DbConfig,
    pub study_db: DbConfig,
}

/// Study-level secrets used by the confidential-ID transform.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyConfig {
    pub global_secret: String,
    pub secret_key: String,
    #[serde(default = "default_id_mapping_method")]
    pub id_mapping_method: String,
}

fn default_id_mapping_method() -> String {
    ident::ID_MAPPING_SHA224.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    pub db_configs: DbConfigs,

    pub instance_id: String,
    pub study_key: String,

    /// Path of the CSV export to migrate.
    pub info_csv: String,
    #[serde(default = "default_csv_separator")]
    pub csv_separator: String,

    /// Perform all lookups and computations but suppress every write.
    #[serde(default)]
    pub dry_run: bool,
    /// Allow overwriting an existing phone number on a user account.
    #[serde(default)]
    pub force_override_phone: bool,
    /// Also store the postal address as a confidential response.
    #[serde(default)]
    pub write_address: bool,
    #[serde(default)]
    pub address_policy: AddressPolicy,

    pub study: StudyConfig,
}

fn default_csv_separator() -> String {
    ",".to_string()
}

impl Config {
    /// Loads the configuration from the file named by `CONFIG_FILE_PATH`.
    pub fn load() -> Result<Self, MigrationError> {
        let path = env::var(ENV_CONFIG_FILE_PATH).map_err(|_| {
            MigrationError::Config(format!(
                "environment variable {} is not set",
                ENV_CONFIG_FILE_PATH
            ))
        })?;
        Self::from_file(&path)
    }

    pub fn from_file(path: &str) -> Result<Self, MigrationError> {
        let contents = fs::read_to_string(path).map_err(|error| {
            MigrationError::Config(format!("failed to read config file {}: {}", path, error))
        })?;

        let mut config: Config = serde_yaml::from_str(&contents).map_err(|error| {
            MigrationError::Config(format!("failed to parse config file {}: {}", path, error))
        })?;

        config.secrets_override();

        Ok(config)
    }

    /// Overrides database credentials from the environment, when set.
    fn secrets_override(&mut self) {
        if let Ok(username) = env::var(ENV_STUDY_DB_USERNAME)
            && !username.is_empty()
        {
            self.db_configs.study_db.username = username;
        }

        if let Ok(password) = env::var(ENV_STUDY_DB_PASSWORD)
            && !password.is_empty()
        {
            self.db_configs.study_db.password = password;
        }

        if let Ok(username) = env::var(ENV_PARTICIPANT_USER_DB_USERNAME)
            && !username.is_empty()
        {
            self.db_configs.participant_user_db.username = username;
        }

        if let Ok(password) = env::var(ENV_PARTICIPANT_USER_DB_PASSWORD)
            && !password.is_empty()
        {
            self.db_configs.participant_user_db.password = password;
        }
    }

    /// Validates `csv_separator` and returns it as a single byte.
    pub fn separator(&self) -> Result<u8, MigrationError> {
        let bytes = self.csv_separator.as_bytes();
        if bytes.len() != 1 {
            return Err(MigrationError::Config(format!(
                "csv_separator must be a single character, got {:?}",
                self.csv_separator
            )));
        }
        Ok(bytes[0])
    }
}
