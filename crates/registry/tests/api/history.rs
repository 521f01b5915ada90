use crate::helpers::{body_text, spawn_app, spawn_app_with_db, station, MockStationStore};
use hyper::StatusCode;
use registry::{db, HistorySample};
use serde_json::{json, Value};
use std::sync::Arc;
use time::{macros::datetime, Duration, OffsetDateTime};

fn sample(datetime: i64, station_type: &str, active: i64, stale: i64) -> HistorySample {
    HistorySample {
        datetime,
        station_type: station_type.to_string(),
        active,
        stale,
    }
}

#[tokio::test]
async fn getcounts_records_active_and_stale_per_type() {
    let test_app = spawn_app_with_db().await;
    let now = OffsetDateTime::now_utc();
    let store = &test_app.state.store;

    for (url, station_type, age) in [
        ("http://a.weather.io", "Vantage", Duration::hours(1)),
        ("http://b.weather.io", "Vantage", Duration::days(40)),
        ("http://c.weather.io", "WMR100", Duration::days(3)),
    ] {
        store
            .upsert_station(station(url, url, station_type, (now - age).unix_timestamp()))
            .await
            .unwrap();
    }

    let response = test_app.get("/register?action=getcounts").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert!(lines[0].starts_with("OK recorded counts at "));
    assert_eq!(
        &lines[1..],
        &[
            "total: active 2, stale 1",
            "Vantage: active 1, stale 1",
            "WMR100: active 1, stale 0",
        ]
    );

    let samples = store.history_samples().await.unwrap();
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.datetime == samples[0].datetime));
}

#[tokio::test]
async fn duplicate_run_timestamp_is_rejected() {
    let test_app = spawn_app_with_db().await;
    let run = datetime!(2024-06-01 12:00 UTC);

    test_app.state.history.record_snapshot(run).await.unwrap();
    let second = test_app.state.history.record_snapshot(run).await;
    assert!(second.is_err());

    let samples = test_app.state.store.history_samples().await.unwrap();
    assert_eq!(samples, vec![sample(run.unix_timestamp(), "total", 0, 0)]);
}

#[tokio::test]
async fn getcounts_storage_failure_is_reported() {
    let mut store = MockStationStore::new();
    store.expect_station_activity().times(1).returning(|| Ok(vec![]));
    store
        .expect_append_history()
        .times(1)
        .returning(|_| Err(db::Error::Writer("channel closed".to_string())));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app.get("/register?action=getcounts").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "FAIL database writer stopped: channel closed\n"
    );
}

#[tokio::test]
async fn history_matrix_fills_gaps_and_leads_with_total() {
    let mut store = MockStationStore::new();
    store.expect_history_samples().times(1).returning(|| {
        Ok(vec![
            sample(100, "Vantage", 3, 0),
            sample(100, "total", 3, 0),
            sample(200, "WMR100", 1, 0),
            sample(200, "Vantage", 4, 1),
            sample(200, "total", 5, 1),
        ])
    });
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app.get("/history").await;
    assert_eq!(response.status(), StatusCode::OK);

    let chart: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        chart,
        json!({
            "stacked": true,
            "sequential": false,
            "fill": false,
            "timestamps": [100, 200],
            "series": [
                { "station_type": "total", "active": [3, 5] },
                { "station_type": "Vantage", "active": [3, 4] },
                { "station_type": "WMR100", "active": [0, 1] }
            ]
        })
    );
}

#[tokio::test]
async fn history_action_passes_rendering_flags_through() {
    let mut store = MockStationStore::new();
    store.expect_history_samples().times(1).returning(|| Ok(vec![]));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .get("/register?action=history&stacked=0&sequential=1&fill=1")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let chart: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(chart["stacked"], false);
    assert_eq!(chart["sequential"], true);
    assert_eq!(chart["fill"], true);
    assert_eq!(chart["timestamps"], json!([]));
    assert_eq!(chart["series"], json!([]));
}

#[tokio::test]
async fn bad_rendering_flag_is_rejected() {
    let test_app = spawn_app(Arc::new(MockStationStore::new())).await;

    let response = test_app.get("/history?fill=maybe").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "FAIL fill must be 0 or 1\n");
}

#[tokio::test]
async fn history_page_renders_the_table() {
    let mut store = MockStationStore::new();
    store.expect_history_samples().times(1).returning(|| {
        Ok(vec![
            sample(1717243200, "total", 7, 2),
            sample(1717243200, "Vantage", 7, 2),
        ])
    });
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app.get("/history/table").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Active stations over time"));
    assert!(html.contains("Vantage"));
    assert!(html.contains("id=\"history-data\""));
}

#[tokio::test]
async fn duplicate_history_flag_answers_in_fail_format() {
    let test_app = spawn_app(Arc::new(MockStationStore::new())).await;

    let response = test_app.get("/history?fill=1&fill=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("FAIL "));
}
