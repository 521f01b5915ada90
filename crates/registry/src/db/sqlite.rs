use async_trait::async_trait;
use log::{error, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::{future::Future, path::Path, str::FromStr, sync::Arc, time::Duration};
use tokio::{
    fs::create_dir_all,
    sync::{mpsc, oneshot},
};

use super::{Error, HistorySample, StationActivity, StationData, StationRecord};

type WriteOperation = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs every write on one task so SQLite never sees two writers at once.
pub struct DatabaseWriter {
    write_tx: mpsc::UnboundedSender<WriteOperation>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for DatabaseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseWriter {
    pub fn new() -> Self {
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<WriteOperation>();

        let handle = tokio::spawn(async move {
            while let Some(future) = write_rx.recv().await {
                future.await;
            }
        });

        Self {
            write_tx,
            _handle: handle,
        }
    }

    pub async fn execute<T, F, Fut>(&self, pool: SqlitePool, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(SqlitePool) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel::<Result<T, Error>>();

        let write_op = Box::pin(async move {
            let result = operation(pool).await;
            let _ = result_tx.send(result);
        });

        self.write_tx
            .send(write_op)
            .map_err(|_| Error::Writer("channel closed".to_string()))?;

        result_rx
            .await
            .map_err(|_| Error::Writer("write result was dropped".to_string()))?
    }
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    writer: Arc<DatabaseWriter>,
}

impl Database {
    /// Open (creating if needed) `stations.sqlite` inside `dir`.
    pub async fn new(dir: &str) -> Result<Self, Error> {
        let db_path = Path::new(dir).join("stations.sqlite");

        create_dir_all(dir).await.map_err(|e| {
            Error::Configuration(format!("cannot create database directory {dir}: {e}"))
        })?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| Error::Configuration(e.to_string()))?
            .create_if_missing(true)
            .pragma("journal_mode", "WAL")
            .pragma("synchronous", "NORMAL")
            .pragma("busy_timeout", "5000")
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let db = Self::from_pool(pool).await?;
        info!("SQLite station database initialized at: {}", db_path.display());
        Ok(db)
    }

    /// A private in-memory database. The pool is pinned to a single
    /// connection that never expires, since closing it drops the data.
    pub async fn in_memory() -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, Error> {
        let db = Self {
            pool,
            writer: Arc::new(DatabaseWriter::new()),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush the WAL into the main database file before shutdown.
    pub async fn checkpoint(&self) {
        match sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&self.pool)
            .await
        {
            Ok(_) => info!("WAL checkpoint completed successfully"),
            Err(e) => error!("WAL checkpoint failed: {}", e),
        }
    }
}

const STATION_COLUMNS: &str = "station_url, description, latitude, longitude, station_type,
     station_model, weewx_info, python_info, platform_info, last_addr, last_seen, user_agent";

fn row_to_station(row: &SqliteRow) -> StationRecord {
    StationRecord {
        station_url: row.get("station_url"),
        description: row.get("description"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        station_type: row.get("station_type"),
        station_model: row.get("station_model"),
        weewx_info: row.get("weewx_info"),
        python_info: row.get("python_info"),
        platform_info: row.get("platform_info"),
        last_addr: row.get("last_addr"),
        last_seen: row.get("last_seen"),
        user_agent: row.get("user_agent"),
    }
}

#[async_trait]
impl StationData for Database {
    async fn upsert_station(&self, record: StationRecord) -> Result<StationRecord, Error> {
        let pool = self.pool.clone();

        self.writer
            .execute(pool, move |pool| async move {
                sqlx::query(&format!(
                    "INSERT INTO stations ({STATION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(station_url) DO UPDATE SET
                        description = excluded.description,
                        latitude = excluded.latitude,
                        longitude = excluded.longitude,
                        station_type = excluded.station_type,
                        station_model = excluded.station_model,
                        weewx_info = excluded.weewx_info,
                        python_info = excluded.python_info,
                        platform_info = excluded.platform_info,
                        last_addr = excluded.last_addr,
                        last_seen = excluded.last_seen,
                        user_agent = excluded.user_agent"
                ))
                .bind(&record.station_url)
                .bind(&record.description)
                .bind(record.latitude)
                .bind(record.longitude)
                .bind(&record.station_type)
                .bind(&record.station_model)
                .bind(&record.weewx_info)
                .bind(&record.python_info)
                .bind(&record.platform_info)
                .bind(&record.last_addr)
                .bind(record.last_seen)
                .bind(&record.user_agent)
                .execute(&pool)
                .await?;

                Ok(record)
            })
            .await
    }

    async fn get_station(&self, station_url: &str) -> Result<Option<StationRecord>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {STATION_COLUMNS} FROM stations WHERE station_url = ?"
        ))
        .bind(station_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_station))
    }

    async fn stations_seen_since(&self, cutoff: i64) -> Result<Vec<StationRecord>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {STATION_COLUMNS} FROM stations WHERE last_seen >= ?"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_station).collect())
    }

    async fn station_activity(&self) -> Result<Vec<StationActivity>, Error> {
        let rows = sqlx::query("SELECT station_type, last_seen FROM stations")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| StationActivity {
                station_type: row.get("station_type"),
                last_seen: row.get("last_seen"),
            })
            .collect())
    }

    async fn count_stations(&self) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn append_history(&self, samples: Vec<HistorySample>) -> Result<(), Error> {
        let pool = self.pool.clone();

        self.writer
            .execute(pool, move |pool| async move {
                let mut tx = pool.begin().await?;

                for sample in &samples {
                    sqlx::query(
                        "INSERT INTO history (datetime, station_type, active, stale)
                         VALUES (?, ?, ?, ?)",
                    )
                    .bind(sample.datetime)
                    .bind(&sample.station_type)
                    .bind(sample.active)
                    .bind(sample.stale)
                    .execute(&mut *tx)
                    .await?;
                }

                tx.commit().await?;
                Ok(())
            })
            .await
    }

    async fn history_samples(&self) -> Result<Vec<HistorySample>, Error> {
        let rows = sqlx::query(
            "SELECT datetime, station_type, active, stale
             FROM history ORDER BY datetime, station_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HistorySample {
                datetime: row.get("datetime"),
                station_type: row.get("station_type"),
                active: row.get("active"),
                stale: row.get("stale"),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
