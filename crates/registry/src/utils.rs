use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use station_registry_core::{find_config_file, load_config, ConfigSource, DEFAULT_REGISTRY_PORT};
use std::env;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Station Registry - collects weather station check-ins and publishes the station list"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $REGISTRY_CONFIG, ./registry.toml,
    /// $XDG_CONFIG_HOME/station-registry/registry.toml, /etc/station-registry/registry.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "REGISTRY_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(short, long, env = "REGISTRY_HOST")]
    #[serde(alias = "host")]
    pub domain: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "REGISTRY_PORT")]
    pub port: Option<String>,

    /// Public URL of this server, used to reject stations registering the registry itself
    #[arg(short, long, env = "REGISTRY_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Directory holding the station database
    #[arg(long, env = "REGISTRY_DB_DIR")]
    pub db_dir: Option<String>,

    /// Directory the station listing is published to and served from
    #[arg(short, long, env = "REGISTRY_STATIC_DIR")]
    pub static_dir: Option<String>,

    /// Also write the server log to this file
    #[arg(long, env = "REGISTRY_LOG_FILE")]
    pub log_file: Option<String>,

    /// File receiving one line per successful registration
    #[arg(long, env = "REGISTRY_RECORD_LOG")]
    pub record_log: Option<String>,

    /// Days without a check-in before a station is considered stale
    #[arg(long, env = "REGISTRY_STALE_DAYS")]
    pub stale_days: Option<u32>,

    /// Regenerate the station listing after every successful registration
    #[arg(long, env = "REGISTRY_REGENERATE_ON_REGISTER")]
    pub regenerate_on_register: Option<bool>,

    /// Placeholder domains a station_url may not contain (comma separated)
    #[arg(long, env = "REGISTRY_BLOCKED_DOMAINS", value_delimiter = ',')]
    pub blocked_domains: Option<Vec<String>>,

    /// Extra URL fragments that identify the registry itself (comma separated)
    #[arg(long, env = "REGISTRY_SELF_REFERENCES", value_delimiter = ',')]
    pub self_references: Option<Vec<String>>,
}

impl Cli {
    pub fn host(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_REGISTRY_PORT.to_string())
    }

    pub fn remote_url(&self) -> String {
        self.remote_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host(), self.port()))
    }

    pub fn db_dir(&self) -> String {
        self.db_dir
            .clone()
            .unwrap_or_else(|| "./station_data".to_string())
    }

    pub fn static_dir(&self) -> String {
        self.static_dir
            .clone()
            .unwrap_or_else(|| "./public".to_string())
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("REGISTRY_CONFIG", "registry.toml")
    };

    // the logger isn't up yet, so a broken file is reported on stderr
    let file_config: Cli = match load_config(&source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ignoring config from {}: {:#}", source, e);
            Cli::default()
        }
    };

    merge(cli_args, file_config)
}

/// CLI args (and env vars, which clap folds into them) win over the file.
fn merge(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        domain: cli_args.domain.or(file_config.domain),
        port: cli_args.port.or(file_config.port),
        remote_url: cli_args.remote_url.or(file_config.remote_url),
        db_dir: cli_args.db_dir.or(file_config.db_dir),
        static_dir: cli_args.static_dir.or(file_config.static_dir),
        log_file: cli_args.log_file.or(file_config.log_file),
        record_log: cli_args.record_log.or(file_config.record_log),
        stale_days: cli_args.stale_days.or(file_config.stale_days),
        regenerate_on_register: cli_args
            .regenerate_on_register
            .or(file_config.regenerate_on_register),
        blocked_domains: cli_args.blocked_domains.or(file_config.blocked_domains),
        self_references: cli_args.self_references.or(file_config.self_references),
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Colored stdout logging, plus a plain copy in `log_file` when one is set.
pub fn setup_logger(log_file: Option<&str>) -> Result<Dispatch, std::io::Error> {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    let stdout = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}: {}",
                timestamp(),
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout());

    let mut dispatch = Dispatch::new().chain(stdout);

    if let Some(path) = log_file {
        let file = Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {}] {}: {}",
                    timestamp(),
                    record.level(),
                    record.target(),
                    message
                ));
            })
            .chain(fern::log_file(path)?);
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Iso8601::DEFAULT)
        .unwrap_or_default()
}
