use std::path::PathBuf;

use station_registry_core::DEFAULT_STALE_DAYS;
use time::Duration;

use crate::Cli;

/// Placeholder domains copied from sample configurations rather than real stations
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] =
    &["example.com", "mydomain.com", "yourdomain.com", "acme.com"];

/// The legacy registration script; stations sometimes register it as their own URL
pub const LEGACY_REGISTER_PATH: &str = "register.cgi";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("stale_days must be at least 1, got {0}")]
    StaleDays(u32),
    #[error("{0} may not be empty")]
    EmptyPath(&'static str),
    #[error("remote_url must start with http:// or https://, got {0}")]
    RemoteUrl(String),
}

/// Settings shared by every component, resolved once at startup
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub remote_url: String,
    pub db_dir: String,
    pub static_dir: PathBuf,
    pub record_log: Option<PathBuf>,
    pub stale_days: u32,
    pub regenerate_on_register: bool,
    /// Lower-cased
    pub blocked_domains: Vec<String>,
    /// Lower-cased; a station_url containing any of these points at the registry
    pub self_references: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let remote_url = "http://127.0.0.1:9890".to_string();
        Self {
            self_references: default_self_references(&remote_url),
            remote_url,
            db_dir: "./station_data".to_string(),
            static_dir: PathBuf::from("./public"),
            record_log: None,
            stale_days: DEFAULT_STALE_DAYS,
            regenerate_on_register: true,
            blocked_domains: DEFAULT_BLOCKED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl RegistryConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let stale_days = cli.stale_days.unwrap_or(DEFAULT_STALE_DAYS);
        if stale_days == 0 {
            return Err(ConfigError::StaleDays(stale_days));
        }

        let remote_url = cli.remote_url().trim_end_matches('/').to_string();
        if !(remote_url.starts_with("http://") || remote_url.starts_with("https://")) {
            return Err(ConfigError::RemoteUrl(remote_url));
        }

        let db_dir = cli.db_dir();
        if db_dir.trim().is_empty() {
            return Err(ConfigError::EmptyPath("db_dir"));
        }
        let static_dir = cli.static_dir();
        if static_dir.trim().is_empty() {
            return Err(ConfigError::EmptyPath("static_dir"));
        }

        let blocked_domains = match &cli.blocked_domains {
            Some(domains) => lowercase_all(domains.as_slice()),
            None => lowercase_all(DEFAULT_BLOCKED_DOMAINS),
        };

        let mut self_references = default_self_references(&remote_url);
        if let Some(extra) = &cli.self_references {
            self_references.extend(lowercase_all(extra.as_slice()));
        }

        Ok(Self {
            remote_url,
            db_dir,
            static_dir: PathBuf::from(static_dir),
            record_log: cli.record_log.as_ref().map(PathBuf::from),
            stale_days,
            regenerate_on_register: cli.regenerate_on_register.unwrap_or(true),
            blocked_domains,
            self_references,
        })
    }

    pub fn retention(&self) -> Duration {
        Duration::days(i64::from(self.stale_days))
    }

    /// Human readable retention window for the published pages
    pub fn retention_text(&self) -> String {
        match self.stale_days {
            1 => "1 day".to_string(),
            n => format!("{} days", n),
        }
    }
}

fn default_self_references(remote_url: &str) -> Vec<String> {
    vec![
        LEGACY_REGISTER_PATH.to_string(),
        format!("{}/register", remote_url.to_lowercase()),
    ]
}

fn lowercase_all<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.as_ref().trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
