//! Configuration file discovery
//!
//! Values are layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (handled by clap in each binary)
//! 3. A TOML config file found by [`find_config_file`]
//! 4. Built-in defaults

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::APP_NAME;

/// Where a configuration was loaded from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path given on the command line or through the service's env var
    Explicit(PathBuf),
    /// Found in the working directory
    CurrentDir(PathBuf),
    /// Found under $XDG_CONFIG_HOME/station-registry/
    XdgConfig(PathBuf),
    /// Found under /etc/station-registry/
    System(PathBuf),
    /// No file found
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigSource::Explicit(p)
            | ConfigSource::CurrentDir(p)
            | ConfigSource::XdgConfig(p)
            | ConfigSource::System(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(p) => write!(f, "{}", p.display()),
            None => write!(f, "(defaults)"),
        }
    }
}

/// Locate a config file for a service.
///
/// `env_var` names the variable holding an explicit path (for example
/// `REGISTRY_CONFIG`), `filename` is the file searched for in the working
/// directory, the XDG config home and `/etc/station-registry/`.
pub fn find_config_file(env_var: &str, filename: &str) -> ConfigSource {
    if let Ok(path) = env::var(env_var) {
        let explicit = PathBuf::from(path);
        if explicit.exists() {
            return ConfigSource::Explicit(explicit);
        }
    }

    let candidates = [
        ConfigSource::CurrentDir(PathBuf::from(filename)),
        ConfigSource::XdgConfig(xdg_config_dir().join(filename)),
        ConfigSource::System(PathBuf::from("/etc").join(APP_NAME).join(filename)),
    ];

    candidates
        .into_iter()
        .find(|source| source.path().is_some_and(|p| p.exists()))
        .unwrap_or(ConfigSource::Defaults)
}

fn xdg_config_dir() -> PathBuf {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_NAME)
    } else if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".config").join(APP_NAME)
    } else {
        PathBuf::from(".config").join(APP_NAME)
    }
}

/// Parse the file behind `source`, or return `T::default()` when there is
/// no file to read.
pub fn load_config<T: DeserializeOwned + Default>(source: &ConfigSource) -> anyhow::Result<T> {
    let Some(path) = source.path() else {
        return Ok(T::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_config<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    Ok(toml::from_str(content)?)
}
