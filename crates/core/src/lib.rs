//! Station Registry Core Library
//!
//! Shared pieces for the registry server and its scheduling daemon:
//! - Configuration file discovery and TOML loading
//! - Filesystem helpers for data and artifact directories

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::create_dir_all;

/// Application name used for XDG paths
pub const APP_NAME: &str = "station-registry";

/// Default registry server port
pub const DEFAULT_REGISTRY_PORT: u16 = 9890;

/// Stations not heard from within this many days are considered stale
pub const DEFAULT_STALE_DAYS: u32 = 30;

/// Default daemon interval between aggregation runs (1 hour)
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 3600;
