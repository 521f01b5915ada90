use clap::Parser;
use slog::{o, Drain, Level, Logger};
use station_registry_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_REGISTRY_PORT, DEFAULT_SNAPSHOT_INTERVAL,
};
use std::{env, time::Duration};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Registry Daemon - records station counts and republishes the station listing on a schedule"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $REGISTRY_DAEMON_CONFIG, ./daemon.toml,
    /// $XDG_CONFIG_HOME/station-registry/daemon.toml, /etc/station-registry/daemon.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "REGISTRY_DAEMON_LEVEL")]
    pub level: Option<String>,

    /// Registry server URL
    #[arg(short, long, env = "REGISTRY_DAEMON_BASE_URL")]
    pub base_url: Option<String>,

    /// Seconds between runs
    #[arg(short, long, env = "REGISTRY_DAEMON_INTERVAL")]
    pub interval: Option<u64>,

    /// Run once and exit instead of looping
    #[arg(long, default_value_t = false)]
    #[serde(default)]
    pub once: bool,

    /// HTTP request timeout in seconds
    #[arg(short, long, env = "REGISTRY_DAEMON_TIMEOUT")]
    pub timeout: Option<u64>,

    /// HTTP User-Agent header for registry requests
    #[arg(short, long, env = "REGISTRY_DAEMON_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", DEFAULT_REGISTRY_PORT))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn interval(&self) -> u64 {
        self.interval
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(60))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("registry-daemon/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("REGISTRY_DAEMON_CONFIG", "daemon.toml")
    };

    merge(cli_args, file_config(&source))
}

// the logger isn't up yet, so a broken file is reported on stderr
fn file_config(source: &ConfigSource) -> Cli {
    match load_config(source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ignoring config from {}: {:#}", source, e);
            Cli::default()
        }
    }
}

/// CLI args override file config (env vars are handled by clap)
fn merge(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        base_url: cli_args.base_url.or(file_config.base_url),
        interval: cli_args.interval.or(file_config.interval),
        once: cli_args.once || file_config.once,
        timeout: cli_args.timeout.or(file_config.timeout),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
    }
}

fn log_level(cli: &Cli) -> Level {
    let level = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_default();

    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level(cli)).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
