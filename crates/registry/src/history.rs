use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{db, HistorySample, RegistryConfig, StationActivity, StationData};

/// Bucket counting every station regardless of type
pub const TOTAL_BUCKET: &str = "total";

/// Count active and stale stations per type, plus the `total` bucket.
///
/// Types with no stations at all produce no sample; [`build_chart`] fills
/// those gaps with zeros.
pub fn snapshot(activity: &[StationActivity], datetime: i64, cutoff: i64) -> Vec<HistorySample> {
    let mut by_type: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    let mut total = (0, 0);

    for station in activity {
        let counts = by_type.entry(station.station_type.as_str()).or_default();
        if station.last_seen >= cutoff {
            counts.0 += 1;
            total.0 += 1;
        } else {
            counts.1 += 1;
            total.1 += 1;
        }
    }

    std::iter::once((TOTAL_BUCKET, total))
        .chain(by_type)
        .map(|(station_type, (active, stale))| HistorySample {
            datetime,
            station_type: station_type.to_string(),
            active,
            stale,
        })
        .collect()
}

/// Rendering hints for the client side chart. The server only echoes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChartOptions {
    pub stacked: bool,
    pub sequential: bool,
    pub fill: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            stacked: true,
            sequential: false,
            fill: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HistorySeries {
    pub station_type: String,
    /// Active station count at each of `HistoryChart::timestamps`
    pub active: Vec<i64>,
}

/// Dense station-count matrix ready for charting
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HistoryChart {
    #[serde(flatten)]
    pub options: ChartOptions,
    /// Aggregation run times, ascending
    pub timestamps: Vec<i64>,
    /// `total` first, then station types alphabetically
    pub series: Vec<HistorySeries>,
}

pub fn build_chart(samples: &[HistorySample], options: ChartOptions) -> HistoryChart {
    let timestamps: Vec<i64> = samples
        .iter()
        .map(|s| s.datetime)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let station_types: BTreeSet<&str> = samples
        .iter()
        .map(|s| s.station_type.as_str())
        .filter(|t| *t != TOTAL_BUCKET)
        .collect();
    let has_total = samples.iter().any(|s| s.station_type == TOTAL_BUCKET);

    let active: HashMap<(i64, &str), i64> = samples
        .iter()
        .map(|s| ((s.datetime, s.station_type.as_str()), s.active))
        .collect();

    let series = has_total
        .then_some(TOTAL_BUCKET)
        .into_iter()
        .chain(station_types)
        .map(|station_type| HistorySeries {
            station_type: station_type.to_string(),
            active: timestamps
                .iter()
                .map(|ts| active.get(&(*ts, station_type)).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    HistoryChart {
        options,
        timestamps,
        series,
    }
}

pub struct HistoryService {
    store: Arc<dyn StationData>,
    config: Arc<RegistryConfig>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn StationData>, config: Arc<RegistryConfig>) -> Self {
        Self { store, config }
    }

    /// One aggregation run: count stations as of `now` and append the batch.
    pub async fn record_snapshot(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<HistorySample>, db::Error> {
        let cutoff = (now - self.config.retention()).unix_timestamp();
        let activity = self.store.station_activity().await?;
        let samples = snapshot(&activity, now.unix_timestamp(), cutoff);

        self.store.append_history(samples.clone()).await?;
        info!(
            "recorded history snapshot at {} for {} buckets",
            now.unix_timestamp(),
            samples.len()
        );
        Ok(samples)
    }

    pub async fn chart(&self, options: ChartOptions) -> Result<HistoryChart, db::Error> {
        let samples = self.store.history_samples().await?;
        Ok(build_chart(&samples, options))
    }
}
