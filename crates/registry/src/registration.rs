use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{Arc, LazyLock},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{db, FileData, RegistryConfig, StationData, StationRecord, TOTAL_BUCKET};

static STATION_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+\.\S+").unwrap());

/// Registration fields exactly as the station sent them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub station_url: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub station_type: Option<String>,
    pub station_model: Option<String>,
    pub weewx_info: Option<String>,
    pub python_info: Option<String>,
    pub platform_info: Option<String>,
}

/// Who sent the registration, as seen by the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Origin {
    pub addr: String,
    pub user_agent: String,
}

/// Every rule a submission broke, plus the submission for echoing back
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub problems: Vec<String>,
    pub submission: Submission,
}

impl ValidationFailure {
    pub fn message(&self) -> String {
        self.problems.join("; ")
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(ValidationFailure),
    #[error(transparent)]
    Storage(#[from] db::Error),
}

#[derive(Clone, Debug)]
pub struct ValidationRules {
    blocked_domains: Vec<String>,
    self_references: Vec<String>,
}

impl From<&RegistryConfig> for ValidationRules {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            blocked_domains: config.blocked_domains.clone(),
            self_references: config.self_references.clone(),
        }
    }
}

impl ValidationRules {
    /// Check every field and build the row to store. All problems are
    /// reported together rather than stopping at the first one.
    pub fn validate(
        &self,
        submission: &Submission,
        origin: &Origin,
        now: OffsetDateTime,
    ) -> Result<StationRecord, ValidationFailure> {
        let mut problems = Vec::new();

        let station_url = trimmed(&submission.station_url);
        self.check_station_url(station_url, &mut problems);

        let station_type = trimmed(&submission.station_type);
        if station_type.is_empty() {
            problems.push("station_type is required".to_string());
        } else if station_type.contains('\'') {
            problems.push("station_type may not contain single quotes".to_string());
        } else if station_type == TOTAL_BUCKET {
            problems.push(format!("station_type \"{}\" is reserved", TOTAL_BUCKET));
        }

        let latitude = parse_coordinate("latitude", &submission.latitude, 90, &mut problems);
        let longitude = parse_coordinate("longitude", &submission.longitude, 180, &mut problems);

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if problems.is_empty() => Ok(StationRecord {
                station_url: station_url.to_string(),
                description: free_text(&submission.description),
                latitude,
                longitude,
                station_type: station_type.to_string(),
                station_model: free_text(&submission.station_model),
                weewx_info: free_text(&submission.weewx_info),
                python_info: free_text(&submission.python_info),
                platform_info: free_text(&submission.platform_info),
                last_addr: origin.addr.clone(),
                last_seen: now.unix_timestamp(),
                user_agent: origin.user_agent.clone(),
            }),
            _ => Err(ValidationFailure {
                problems,
                submission: submission.clone(),
            }),
        }
    }

    fn check_station_url(&self, url: &str, problems: &mut Vec<String>) {
        if url.is_empty() {
            problems.push("station_url is required".to_string());
            return;
        }

        if !STATION_URL_PATTERN.is_match(url) {
            problems.push(
                "station_url must be an http:// or https:// address with a domain name"
                    .to_string(),
            );
        }

        let lower = url.to_lowercase();
        if let Some(domain) = self
            .blocked_domains
            .iter()
            .find(|d| lower.contains(d.as_str()))
        {
            problems.push(format!(
                "station_url may not use the placeholder domain {}",
                domain
            ));
        }
        if self
            .self_references
            .iter()
            .any(|r| references(&lower, r))
        {
            problems.push("station_url may not point at the station registry".to_string());
        }
        if url.contains('\'') {
            problems.push("station_url may not contain single quotes".to_string());
        }
    }
}

/// True when `reference` occurs in `url` as a whole path segment, so
/// `/register` matches `/register?x` but not `/registered-stations/`.
fn references(url: &str, reference: &str) -> bool {
    !reference.is_empty()
        && url.match_indices(reference).any(|(at, _)| {
            matches!(
                url[at + reference.len()..].chars().next(),
                None | Some('/' | '?' | '#')
            )
        })
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

/// Quotes are dropped from free text instead of failing the registration.
fn free_text(value: &Option<String>) -> String {
    trimmed(value).replace('\'', "")
}

fn parse_coordinate(
    name: &str,
    value: &Option<String>,
    limit: i32,
    problems: &mut Vec<String>,
) -> Option<f64> {
    let raw = trimmed(value);
    if raw.is_empty() {
        problems.push(format!("{} is required", name));
        return None;
    }
    if !raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        problems.push(format!("{} may only contain digits, '.' and '-'", name));
        return None;
    }

    match raw.parse::<f64>() {
        Ok(parsed) if (-f64::from(limit)..=f64::from(limit)).contains(&parsed) => Some(parsed),
        Ok(_) => {
            problems.push(format!("{} must be between -{} and {}", name, limit, limit));
            None
        }
        Err(_) => {
            problems.push(format!("{} is not a decimal number", name));
            None
        }
    }
}

pub struct Registrar {
    store: Arc<dyn StationData>,
    files: Arc<dyn FileData>,
    rules: ValidationRules,
}

impl Registrar {
    pub fn new(
        store: Arc<dyn StationData>,
        files: Arc<dyn FileData>,
        rules: ValidationRules,
    ) -> Self {
        Self {
            store,
            files,
            rules,
        }
    }

    /// Validate and upsert one check-in. Storage is untouched when
    /// validation fails.
    pub async fn register(
        &self,
        submission: Submission,
        origin: Origin,
        now: OffsetDateTime,
    ) -> Result<StationRecord, Error> {
        let record = self
            .rules
            .validate(&submission, &origin, now)
            .map_err(Error::Validation)?;

        let stored = self.store.upsert_station(record).await?;
        info!(
            "registered {} ({}) from {}",
            stored.station_url, stored.station_type, stored.last_addr
        );

        if let Err(e) = self.files.append_line(&record_line(&stored, now)).await {
            warn!("registration stored but not recorded: {}", e);
        }

        Ok(stored)
    }
}

fn record_line(record: &StationRecord, now: OffsetDateTime) -> String {
    format!(
        "{} {} {} {} \"{}\"",
        now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string()),
        record.last_addr,
        record.station_url,
        record.station_type,
        record.user_agent
    )
}
