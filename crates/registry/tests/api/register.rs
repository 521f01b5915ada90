use crate::helpers::{
    body_text, spawn_app, spawn_app_with_db, spawn_regenerating_app, MockStationStore,
};
use axum::{body::Body, http::Request};
use hyper::{header, Method, StatusCode};
use registry::db;
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

#[tokio::test]
async fn registration_is_stored_with_caller_details() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .register("https://wx.fieldnotes.org/", "Hill Top", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "OK registered https://wx.fieldnotes.org/\n"
    );

    let stored = test_app
        .state
        .store
        .get_station("https://wx.fieldnotes.org/")
        .await
        .unwrap()
        .expect("station was not stored");
    assert_eq!(stored.description, "Hill Top");
    assert_eq!(stored.station_type, "Vantage");
    assert_eq!(stored.station_model, "Vantage Pro2");
    assert_eq!(stored.latitude, 45.5);
    assert_eq!(stored.longitude, -122.6);
    assert_eq!(stored.last_addr, "198.51.100.20");
    assert_eq!(stored.user_agent, "weewx/4.10.2");
}

#[tokio::test]
async fn query_string_registration_is_accepted() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .get("/register?station_url=http://weather.lakeside.net&latitude=-33.9&longitude=151.2&station_type=FineOffsetUSB")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("OK"));
    assert_eq!(test_app.state.store.count_stations().await.unwrap(), 1);
}

#[tokio::test]
async fn legacy_script_path_accepts_registrations() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .post_form(
            "/register/register.cgi",
            "station_url=http://weather.lakeside.net&latitude=10&longitude=10&station_type=WMR100",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_app.state.store.count_stations().await.unwrap(), 1);
}

#[tokio::test]
async fn reregistration_replaces_the_row() {
    let test_app = spawn_app_with_db().await;

    test_app
        .register("http://wx.fieldnotes.org", "Old Name", "Vantage")
        .await;
    let response = test_app
        .register("http://wx.fieldnotes.org", "New Name", "WMR200")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(test_app.state.store.count_stations().await.unwrap(), 1);
    let stored = test_app
        .state
        .store
        .get_station("http://wx.fieldnotes.org")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.description, "New Name");
    assert_eq!(stored.station_type, "WMR200");
}

#[tokio::test]
async fn every_problem_is_reported_and_nothing_is_stored() {
    let mut store = MockStationStore::new();
    store.expect_upsert_station().times(0);
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .post_form(
            "/register",
            "station_url=ftp://nowhere&latitude=91&longitude=abc&station_type=",
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = body_text(response).await;
    assert!(body.starts_with("FAIL "));
    assert!(body.contains("station_url must be an http:// or https:// address with a domain name"));
    assert!(body.contains("station_type is required"));
    assert!(body.contains("latitude must be between -90 and 90"));
    assert!(body.contains("longitude may only contain digits, '.' and '-'"));
}

#[tokio::test]
async fn placeholder_and_self_referencing_urls_are_rejected() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .register("http://www.example.com/weather", "Sample", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("station_url may not use the placeholder domain example.com"));

    let response = test_app
        .register("http://wx.fieldnotes.org/register.cgi", "Loop", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("station_url may not point at the station registry"));

    assert_eq!(test_app.state.store.count_stations().await.unwrap(), 0);
}

#[tokio::test]
async fn total_is_a_reserved_station_type() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .register("http://wx.fieldnotes.org", "Hill Top", "total")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("station_type \"total\" is reserved"));
}

#[tokio::test]
async fn quotes_are_stripped_from_free_text() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .register("http://wx.fieldnotes.org", "Bob's 'Hill' Station", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = test_app
        .state
        .store
        .get_station("http://wx.fieldnotes.org")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.description, "Bobs Hill Station");
}

#[tokio::test]
async fn storage_failure_is_a_server_error() {
    let mut store = MockStationStore::new();
    store
        .expect_upsert_station()
        .times(1)
        .returning(|_| Err(db::Error::Writer("channel closed".to_string())));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .register("http://wx.fieldnotes.org", "Hill Top", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "FAIL database writer stopped: channel closed\n"
    );
}

#[tokio::test]
async fn configuration_failure_is_labelled() {
    let mut store = MockStationStore::new();
    store
        .expect_upsert_station()
        .times(1)
        .returning(|_| Err(db::Error::Configuration("read-only directory".to_string())));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .register("http://wx.fieldnotes.org", "Hill Top", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response)
        .await
        .starts_with("FAIL server configuration error: "));
}

#[tokio::test]
async fn debug_echoes_the_stored_record() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .post_form(
            "/register",
            "station_url=http://wx.fieldnotes.org&latitude=1&longitude=2&station_type=Vantage&weewx_info=4.10.2&debug=1",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "OK registered http://wx.fieldnotes.org");
    assert!(lines.contains(&"weewx_info: 4.10.2"));
    assert!(lines.contains(&"last_addr: 198.51.100.20"));
}

#[tokio::test]
async fn debug_echoes_rejected_fields_with_caller() {
    let test_app = spawn_app_with_db().await;

    let response = test_app
        .post_form("/register", "station_url=http://wx.fieldnotes.org&debug=yes")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_text(response).await;
    assert!(body.starts_with("FAIL "));
    assert!(body.contains("\nstation_url: http://wx.fieldnotes.org\n"));
    assert!(body.contains("\nremote_addr: 198.51.100.20\n"));
    assert!(body.contains("\nuser_agent: weewx/4.10.2\n"));
}

#[tokio::test]
async fn successful_registrations_are_recorded() {
    let test_app = spawn_app_with_db().await;

    test_app
        .register("http://wx.fieldnotes.org", "Hill Top", "Vantage")
        .await;
    test_app
        .register("http://weather.lakeside.net", "Lakeside", "WMR100")
        .await;
    test_app.register("not a url", "Broken", "Vantage").await;

    let log = std::fs::read_to_string(&test_app.record_log).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" 198.51.100.20 http://wx.fieldnotes.org Vantage \"weewx/4.10.2\""));
    assert!(lines[1].contains("http://weather.lakeside.net WMR100"));
}

#[tokio::test]
async fn other_methods_are_rejected() {
    let test_app = spawn_app(Arc::new(MockStationStore::new())).await;

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/register")
        .body(Body::empty())
        .unwrap();
    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "FAIL method PUT is not supported, use GET or POST\n"
    );
}

#[tokio::test]
async fn unknown_and_unsupported_actions_are_rejected() {
    let test_app = spawn_app(Arc::new(MockStationStore::new())).await;

    let response = test_app.get("/register?action=dropall").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "FAIL unknown action dropall\n");

    for action in ["chkenv", "arclog"] {
        let response = test_app.get(&format!("/register?action={}", action)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            format!("FAIL action {} is not supported by this server\n", action)
        );
    }
}

#[tokio::test]
async fn duplicate_query_field_answers_in_fail_format() {
    let mut store = MockStationStore::new();
    store.expect_upsert_station().times(0);
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .get("/register?station_url=http://a.weather.io&station_url=http://b.weather.io&latitude=1&longitude=1&station_type=Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = body_text(response).await;
    assert!(body.starts_with("FAIL "));
    assert!(body.contains("station_url"));
}

#[tokio::test]
async fn post_without_form_content_type_answers_in_fail_format() {
    let mut store = MockStationStore::new();
    store.expect_upsert_station().times(0);
    let test_app = spawn_app(Arc::new(store)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/register")
        .body(Body::from(
            "station_url=http://wx.fieldnotes.org&latitude=1&longitude=2&station_type=Vantage",
        ))
        .unwrap();
    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("FAIL "));
}

#[tokio::test]
async fn failed_listing_regeneration_keeps_registration_ok() {
    let mut store = MockStationStore::new();
    store
        .expect_upsert_station()
        .times(1)
        .returning(|record| Ok(record));
    store
        .expect_stations_seen_since()
        .returning(|_| Err(db::Error::Writer("channel closed".to_string())));
    let test_app = spawn_regenerating_app(Arc::new(store)).await;

    let response = test_app
        .register("http://wx.fieldnotes.org", "Hill Top", "Vantage")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "OK registered http://wx.fieldnotes.org\n"
    );

    // the detached regeneration still writes a page, annotated with the failure
    let page_path = test_app.static_dir.join("index.html");
    let mut page = None;
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read_to_string(&page_path) {
            page = Some(contents);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let page = page.expect("listing was not regenerated after registration");
    assert!(page.contains("Station data unavailable"));
}
