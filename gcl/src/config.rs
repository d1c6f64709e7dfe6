#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gcl_verify::VerifyOptions;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const CONFIG_FILE: &str = "gcl.toml";

/// Session configuration, read from `gcl.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub verify: VerifyOptions,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        config
            .verify
            .validate()
            .map_err(|message| Error::Config { message })?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|e| Error::CannotReadFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&raw).map_err(|e| match e {
            Error::Config { message } => Error::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads the nearest `gcl.toml` at or above `start`, or the defaults when
    /// there is none.
    pub fn discover(start: &Path) -> Result<Self, Error> {
        match find_config(start) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };
    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !cur.pop() {
            return None;
        }
    }
}
