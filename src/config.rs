use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5020;
const DEFAULT_BODY_LIMIT_MB: usize = 5;
const DEFAULT_INPUT_OP: &str = "x";
const DEFAULT_OUTPUT_OP: &str = "Identity";

/// Weights live next to the crate, not relative to the working directory.
const DEFAULT_MODEL_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/model/best_model.pb");

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    pub model_path: PathBuf,
    pub model_url: Option<String>,
    pub input_op: String,
    pub output_op: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let body_limit_bytes = match lookup("BODY_LIMIT_MB") {
            Some(value) => {
                let invalid = || ConfigError::Invalid {
                    name: "BODY_LIMIT_MB",
                    expected: "a valid integer",
                    value: value.clone(),
                };
                value
                    .parse::<usize>()
                    .ok()
                    .and_then(|mb| mb.checked_mul(1024 * 1024))
                    .ok_or_else(invalid)?
            }
            None => DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
        };

        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a valid number between 0 and 65535",
                value: value.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            body_limit_bytes,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            model_url: lookup("MODEL_URL").filter(|url| !url.is_empty()),
            input_op: lookup("MODEL_INPUT_OP").unwrap_or_else(|| DEFAULT_INPUT_OP.into()),
            output_op: lookup("MODEL_OUTPUT_OP").unwrap_or_else(|| DEFAULT_OUTPUT_OP.into()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
