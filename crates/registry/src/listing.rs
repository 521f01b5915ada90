use itertools::Itertools;
use log::{error, info};
use serde::Serialize;
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{
    file_access, templates::station_listing_page, FileData, RegistryConfig, StationData,
    StationRecord, LISTING_JSON, LISTING_PAGE,
};

/// The active stations at one point in time
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Listing {
    /// Unix timestamp the listing was built at
    pub generated_at: i64,
    pub stale_days: u32,
    pub retention: String,
    pub stations: Vec<StationRecord>,
    /// Set when the station database could not be read
    pub error: Option<String>,
}

/// Keep the newest row per `station_url` and order the result for display.
pub fn latest_per_station(rows: Vec<StationRecord>) -> Vec<StationRecord> {
    let mut latest: HashMap<String, StationRecord> = HashMap::new();
    for row in rows {
        match latest.entry(row.station_url.clone()) {
            Entry::Occupied(mut current) => {
                if row.last_seen > current.get().last_seen {
                    current.insert(row);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }

    latest
        .into_values()
        .sorted_by_cached_key(|s| (sort_key(&s.description), s.station_url.clone()))
        .collect()
}

/// Lower-cased description with leading punctuation and spaces removed,
/// so `"  'Alpine"` sorts next to `"alpine"`.
pub fn sort_key(description: &str) -> String {
    description
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

pub struct ListingPublisher {
    store: Arc<dyn StationData>,
    files: Arc<dyn FileData>,
    config: Arc<RegistryConfig>,
}

impl ListingPublisher {
    pub fn new(
        store: Arc<dyn StationData>,
        files: Arc<dyn FileData>,
        config: Arc<RegistryConfig>,
    ) -> Self {
        Self {
            store,
            files,
            config,
        }
    }

    /// Build the listing for `now`. A database failure is carried in
    /// `Listing::error` instead of being returned.
    pub async fn collect(&self, now: OffsetDateTime) -> Listing {
        let cutoff = (now - self.config.retention()).unix_timestamp();

        let (stations, error) = match self.store.stations_seen_since(cutoff).await {
            Ok(rows) => (
                latest_per_station(
                    rows.into_iter()
                        .filter(|row| row.last_seen >= cutoff)
                        .collect(),
                ),
                None,
            ),
            Err(e) => {
                error!("failed to read stations for listing: {}", e);
                (vec![], Some(e.to_string()))
            }
        };

        Listing {
            generated_at: now.unix_timestamp(),
            stale_days: self.config.stale_days,
            retention: self.config.retention_text(),
            stations,
            error,
        }
    }

    /// Rebuild and write `index.html` and `stations.json`.
    pub async fn publish(&self, now: OffsetDateTime) -> Result<Listing, file_access::Error> {
        let listing = self.collect(now).await;

        let page = station_listing_page(&listing).into_string();
        self.files
            .write_artifact(LISTING_PAGE, page.as_bytes())
            .await?;

        // serializing plain strings and numbers cannot fail
        let json = serde_json::to_vec_pretty(&listing).unwrap_or_default();
        self.files.write_artifact(LISTING_JSON, &json).await?;

        info!(
            "published station listing with {} active stations",
            listing.stations.len()
        );
        Ok(listing)
    }

    /// Run [`publish`](Self::publish) on a detached task. The outcome is
    /// only logged.
    pub fn publish_in_background(self: &Arc<Self>) {
        let publisher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(OffsetDateTime::now_utc()).await {
                error!("failed to regenerate station listing: {}", e);
            }
        });
    }
}
