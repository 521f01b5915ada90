use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use hyper::{header, Method};
use mockall::mock;
use registry::{
    app, db, AppState, Database, FileAccess, HistorySample, RegistryConfig, StationActivity,
    StationData, StationRecord,
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tower::ServiceExt;

mock! {
    pub StationStore {}

    #[async_trait]
    impl StationData for StationStore {
        async fn upsert_station(&self, record: StationRecord) -> Result<StationRecord, db::Error>;
        async fn get_station(&self, station_url: &str) -> Result<Option<StationRecord>, db::Error>;
        async fn stations_seen_since(&self, cutoff: i64) -> Result<Vec<StationRecord>, db::Error>;
        async fn station_activity(&self) -> Result<Vec<StationActivity>, db::Error>;
        async fn count_stations(&self) -> Result<i64, db::Error>;
        async fn append_history(&self, samples: Vec<HistorySample>) -> Result<(), db::Error>;
        async fn history_samples(&self) -> Result<Vec<HistorySample>, db::Error>;
        async fn health_check(&self) -> Result<(), db::Error>;
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub static_dir: PathBuf,
    pub record_log: PathBuf,
}

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "registry-api-{}-{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ))
}

pub fn test_config(static_dir: PathBuf, record_log: PathBuf) -> RegistryConfig {
    RegistryConfig {
        static_dir,
        record_log: Some(record_log),
        regenerate_on_register: false,
        ..Default::default()
    }
}

pub async fn spawn_app(store: Arc<dyn StationData>) -> TestApp {
    spawn_app_with(store, false).await
}

/// App that also republishes the listing after each successful registration
pub async fn spawn_regenerating_app(store: Arc<dyn StationData>) -> TestApp {
    spawn_app_with(store, true).await
}

async fn spawn_app_with(store: Arc<dyn StationData>, regenerate_on_register: bool) -> TestApp {
    let static_dir = scratch_dir();
    let record_log = static_dir.join("logs").join("register.log");
    let config = RegistryConfig {
        regenerate_on_register,
        ..test_config(static_dir.clone(), record_log.clone())
    };
    let files = Arc::new(FileAccess::new(
        config.static_dir.clone(),
        config.record_log.clone(),
    ));

    let state = AppState::new(config, store, files);
    TestApp {
        app: app(state.clone()),
        state,
        static_dir,
        record_log,
    }
}

/// App backed by a fresh in-memory SQLite database
pub async fn spawn_app_with_db() -> TestApp {
    let db = Database::in_memory()
        .await
        .expect("Failed to create in-memory database");
    spawn_app(Arc::new(db)).await
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.20")
            .header(header::USER_AGENT, "weewx/4.10.2")
            .body(Body::empty())
            .unwrap();

        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "198.51.100.20")
            .header(header::USER_AGENT, "weewx/4.10.2")
            .body(Body::from(form.to_string()))
            .unwrap();

        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, url: &str, description: &str, station_type: &str) -> Response {
        let form = format!(
            "station_url={}&description={}&latitude=45.5&longitude=-122.6&station_type={}&station_model=Vantage+Pro2",
            encode(url),
            encode(description),
            encode(station_type)
        );
        self.post_form("/register", &form).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.static_dir);
    }
}

pub async fn body_text(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Minimal form encoding for the characters the tests use
pub fn encode(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('&', "%26")
        .replace('+', "%2B")
        .replace('\'', "%27")
        .replace(' ', "+")
}

pub fn station(url: &str, description: &str, station_type: &str, last_seen: i64) -> StationRecord {
    StationRecord {
        station_url: url.to_string(),
        description: description.to_string(),
        latitude: 45.5,
        longitude: -122.6,
        station_type: station_type.to_string(),
        station_model: String::new(),
        weewx_info: String::new(),
        python_info: String::new(),
        platform_info: String::new(),
        last_addr: "198.51.100.20".to_string(),
        last_seen,
        user_agent: String::new(),
    }
}
