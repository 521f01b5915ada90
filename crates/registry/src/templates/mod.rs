pub mod components;
pub mod fragments;
pub mod layouts;
pub mod pages;

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub use fragments::{error_notice, history_table, station_table};
pub use layouts::{CurrentPage, PageConfig};
pub use pages::{history_page, station_listing_page};

/// RFC 3339 rendering of a unix timestamp, or the raw number if it is out of range
pub fn format_timestamp(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| unix.to_string())
}
