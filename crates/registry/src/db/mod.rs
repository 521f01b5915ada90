mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use sqlite::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid database configuration: {0}")]
    Configuration(String),
    #[error("station database unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("failed to migrate station database: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("database writer stopped: {0}")]
    Writer(String),
}

/// A registered station, one per `station_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationRecord {
    pub station_url: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub station_type: String,
    pub station_model: String,
    pub weewx_info: String,
    pub python_info: String,
    pub platform_info: String,
    pub last_addr: String,
    /// Unix timestamp of the most recent registration
    pub last_seen: i64,
    pub user_agent: String,
}

/// The two columns the history aggregator needs from each station row
#[derive(Debug, Clone, PartialEq)]
pub struct StationActivity {
    pub station_type: String,
    pub last_seen: i64,
}

/// Station counts for one station type at one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistorySample {
    pub datetime: i64,
    pub station_type: String,
    pub active: i64,
    pub stale: i64,
}

#[async_trait]
pub trait StationData: Send + Sync {
    /// Insert the station, or replace every mutable column of the existing
    /// row with the same `station_url`.
    async fn upsert_station(&self, record: StationRecord) -> Result<StationRecord, Error>;
    async fn get_station(&self, station_url: &str) -> Result<Option<StationRecord>, Error>;
    /// Rows with `last_seen >= cutoff`, in no particular order
    async fn stations_seen_since(&self, cutoff: i64) -> Result<Vec<StationRecord>, Error>;
    async fn station_activity(&self) -> Result<Vec<StationActivity>, Error>;
    async fn count_stations(&self) -> Result<i64, Error>;
    /// Append one aggregation batch atomically.
    async fn append_history(&self, samples: Vec<HistorySample>) -> Result<(), Error>;
    /// Every history row ordered by `datetime` then `station_type`
    async fn history_samples(&self) -> Result<Vec<HistorySample>, Error>;
    async fn health_check(&self) -> Result<(), Error>;
}
