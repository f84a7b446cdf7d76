//! Runtime configuration read from the environment.

use std::path::PathBuf;

use crate::error::AppError;

/// Environment variable naming the adventure directory.
pub const DATA_DIR_VAR: &str = "CROSSROADS_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "./adventures";

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one JSON file per stored blob.
    pub data_dir: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but unusable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `CROSSROADS_DATA_DIR` is set to an
    /// empty value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let data_dir = match lookup(DATA_DIR_VAR) {
            Some(value) if value.trim().is_empty() => {
                return Err(AppError::Config(format!("{DATA_DIR_VAR} must not be empty")));
            }
            Some(value) => PathBuf::from(value),
            None => PathBuf::from(DEFAULT_DATA_DIR),
        };
        Ok(Self { data_dir })
    }

    /// Applies a `--data-dir` flag, which wins over the environment.
    #[must_use]
    pub fn with_data_dir(self, data_dir: Option<PathBuf>) -> Self {
        match data_dir {
            Some(data_dir) => Self { data_dir },
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("./adventures"));
    }

    #[test]
    fn test_reads_data_dir_variable() {
        let config = Config::from_lookup(|name| {
            (name == DATA_DIR_VAR).then(|| "/var/lib/crossroads".to_owned())
        })
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/crossroads"));
    }

    #[test]
    fn test_empty_data_dir_is_rejected() {
        let result = Config::from_lookup(|_| Some("  ".to_owned()));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_flag_overrides_environment() {
        let config = Config::from_lookup(|_| Some("/from/env".to_owned()))
            .unwrap()
            .with_data_dir(Some(PathBuf::from("/from/flag")));

        assert_eq!(config.data_dir, PathBuf::from("/from/flag"));
    }
}
