use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        ConnectInfo, Form, Query, State,
    },
    http::{header::USER_AGENT, Extensions, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::debug;
use serde::Deserialize;
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

use crate::{
    registration, templates::format_timestamp, AppState, Origin, StationRecord, StatusReply,
    Submission,
};

use super::history::chart_options;

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RegisterParams {
    /// Public URL of the station; identifies it in the registry
    pub station_url: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    /// Driver name, for example Vantage or FineOffsetUSB
    pub station_type: Option<String>,
    pub station_model: Option<String>,
    pub weewx_info: Option<String>,
    pub python_info: Option<String>,
    pub platform_info: Option<String>,
    /// genhtml, getcounts, history; empty registers the station
    pub action: Option<String>,
    /// Echo the stored record when truthy
    pub debug: Option<String>,
    pub stacked: Option<String>,
    pub sequential: Option<String>,
    pub fill: Option<String>,
}

impl RegisterParams {
    pub fn submission(&self) -> Submission {
        Submission {
            station_url: self.station_url.clone(),
            description: self.description.clone(),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            station_type: self.station_type.clone(),
            station_model: self.station_model.clone(),
            weewx_info: self.weewx_info.clone(),
            python_info: self.python_info.clone(),
            platform_info: self.platform_info.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    GenerateHtml,
    GetCounts,
    History,
    CheckEnvironment,
    ArchiveLog,
}

impl Action {
    pub fn parse(value: Option<&str>) -> Result<Self, String> {
        match value.map(str::trim).unwrap_or_default() {
            "" => Ok(Action::Register),
            "genhtml" => Ok(Action::GenerateHtml),
            "getcounts" => Ok(Action::GetCounts),
            "history" => Ok(Action::History),
            "chkenv" => Ok(Action::CheckEnvironment),
            "arclog" => Ok(Action::ArchiveLog),
            other => Err(other.to_string()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/register",
    params(RegisterParams),
    responses(
        (status = OK, description = "First line is OK", content_type = "text/plain", body = String),
        (status = BAD_REQUEST, description = "First line is FAIL followed by every violated rule", content_type = "text/plain", body = String),
        (status = INTERNAL_SERVER_ERROR, description = "Station database unavailable or misconfigured", content_type = "text/plain", body = String)
    ))]
pub async fn register_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    query: Result<Query<RegisterParams>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(params)) => dispatch(&state, params, origin(&headers, &extensions)).await,
        Err(rejection) => malformed_request(rejection.body_text()).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "First line is OK", content_type = "text/plain", body = String),
        (status = BAD_REQUEST, description = "First line is FAIL followed by every violated rule", content_type = "text/plain", body = String),
        (status = INTERNAL_SERVER_ERROR, description = "Station database unavailable or misconfigured", content_type = "text/plain", body = String)
    ))]
pub async fn register_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    form: Result<Form<RegisterParams>, FormRejection>,
) -> Response {
    match form {
        Ok(Form(params)) => dispatch(&state, params, origin(&headers, &extensions)).await,
        Err(rejection) => malformed_request(rejection.body_text()).into_response(),
    }
}

/// Extractor rejections still answer in the `FAIL` line format.
pub fn malformed_request(message: String) -> StatusReply {
    StatusReply::fail(StatusCode::BAD_REQUEST, message)
}

pub async fn unsupported_method(method: Method) -> StatusReply {
    StatusReply::fail(
        StatusCode::BAD_REQUEST,
        format!("method {} is not supported, use GET or POST", method),
    )
}

/// Caller address: first `X-Forwarded-For` hop when behind a proxy,
/// otherwise the peer address of the connection.
pub fn origin(headers: &HeaderMap, extensions: &Extensions) -> Origin {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let addr = forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(peer)| peer.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Origin { addr, user_agent }
}

async fn dispatch(state: &Arc<AppState>, params: RegisterParams, origin: Origin) -> Response {
    let action = match Action::parse(params.action.as_deref()) {
        Ok(action) => action,
        Err(unknown) => {
            return StatusReply::fail(
                StatusCode::BAD_REQUEST,
                format!("unknown action {}", unknown),
            )
            .into_response()
        }
    };
    debug!("register endpoint action {:?} from {}", action, origin.addr);

    let now = OffsetDateTime::now_utc();
    match action {
        Action::Register => register_station(state, &params, origin, now)
            .await
            .into_response(),
        Action::GenerateHtml => generate_listing(state, now).await.into_response(),
        Action::GetCounts => record_counts(state, now).await.into_response(),
        Action::History => {
            let options = match chart_options(
                params.stacked.as_deref(),
                params.sequential.as_deref(),
                params.fill.as_deref(),
            ) {
                Ok(options) => options,
                Err(msg) => return StatusReply::fail(StatusCode::BAD_REQUEST, msg).into_response(),
            };
            match state.history.chart(options).await {
                Ok(chart) => Json(chart).into_response(),
                Err(e) => StatusReply::storage_failure(&e).into_response(),
            }
        }
        Action::CheckEnvironment | Action::ArchiveLog => StatusReply::fail(
            StatusCode::BAD_REQUEST,
            format!(
                "action {} is not supported by this server",
                params.action.as_deref().unwrap_or_default().trim()
            ),
        )
        .into_response(),
    }
}

async fn register_station(
    state: &Arc<AppState>,
    params: &RegisterParams,
    origin: Origin,
    now: OffsetDateTime,
) -> StatusReply {
    let echo = is_truthy(params.debug.as_deref());
    let submission = params.submission();

    match state
        .registrar
        .register(submission.clone(), origin.clone(), now)
        .await
    {
        Ok(stored) => {
            if state.config.regenerate_on_register {
                state.listing.publish_in_background();
            }
            let reply = StatusReply::ok(format!("registered {}", stored.station_url));
            if echo {
                reply.with_details(record_details(&stored))
            } else {
                reply
            }
        }
        Err(registration::Error::Validation(failure)) => {
            let reply = StatusReply::fail(StatusCode::BAD_REQUEST, failure.message());
            if echo {
                reply.with_details(submission_details(&failure.submission, &origin))
            } else {
                reply
            }
        }
        Err(e) => e.into(),
    }
}

async fn generate_listing(state: &Arc<AppState>, now: OffsetDateTime) -> StatusReply {
    match state.listing.publish(now).await {
        Ok(listing) => match listing.error {
            Some(e) => StatusReply::fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("listing published without station data: {}", e),
            ),
            None => StatusReply::ok(format!(
                "published listing with {} stations",
                listing.stations.len()
            )),
        },
        Err(e) => StatusReply::fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn record_counts(state: &Arc<AppState>, now: OffsetDateTime) -> StatusReply {
    match state.history.record_snapshot(now).await {
        Ok(samples) => StatusReply::ok(format!(
            "recorded counts at {}",
            format_timestamp(now.unix_timestamp())
        ))
        .with_details(
            samples
                .iter()
                .map(|s| format!("{}: active {}, stale {}", s.station_type, s.active, s.stale))
                .collect(),
        ),
        Err(e) => StatusReply::storage_failure(&e),
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn record_details(record: &StationRecord) -> Vec<String> {
    vec![
        format!("station_url: {}", record.station_url),
        format!("description: {}", record.description),
        format!("latitude: {}", record.latitude),
        format!("longitude: {}", record.longitude),
        format!("station_type: {}", record.station_type),
        format!("station_model: {}", record.station_model),
        format!("weewx_info: {}", record.weewx_info),
        format!("python_info: {}", record.python_info),
        format!("platform_info: {}", record.platform_info),
        format!("last_addr: {}", record.last_addr),
        format!("last_seen: {}", format_timestamp(record.last_seen)),
        format!("user_agent: {}", record.user_agent),
    ]
}

fn submission_details(submission: &Submission, origin: &Origin) -> Vec<String> {
    let field = |name: &str, value: &Option<String>| {
        format!("{}: {}", name, value.as_deref().unwrap_or_default())
    };
    vec![
        field("station_url", &submission.station_url),
        field("description", &submission.description),
        field("latitude", &submission.latitude),
        field("longitude", &submission.longitude),
        field("station_type", &submission.station_type),
        field("station_model", &submission.station_model),
        field("weewx_info", &submission.weewx_info),
        field("python_info", &submission.python_info),
        field("platform_info", &submission.platform_info),
        format!("remote_addr: {}", origin.addr),
        format!("user_agent: {}", origin.user_agent),
    ]
}
