pub mod db;
mod file_access;
pub mod history;
pub mod listing;
pub mod registration;
pub mod routes;
mod settings;
mod startup;
pub mod templates;
mod utils;

pub use db::{Database, DatabaseWriter, HistorySample, StationActivity, StationData, StationRecord};
pub use file_access::{Error as FileError, FileAccess, FileData, LISTING_JSON, LISTING_PAGE};
pub use history::{
    build_chart, snapshot, ChartOptions, HistoryChart, HistorySeries, HistoryService, TOTAL_BUCKET,
};
pub use listing::{latest_per_station, sort_key, Listing, ListingPublisher};
pub use registration::{Origin, Registrar, Submission, ValidationFailure, ValidationRules};
pub use routes::StatusReply;
pub use settings::{ConfigError, RegistryConfig, DEFAULT_BLOCKED_DOMAINS, LEGACY_REGISTER_PATH};
pub use startup::{app, build_app_state, AppState};
pub use utils::{get_config_info, get_log_level, setup_logger, Cli};
