use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{templates::history_page, AppState, ChartOptions, HistoryChart, StatusReply};

use super::register::malformed_request;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Stack the series (0 or 1, default 1)
    pub stacked: Option<String>,
    /// Space samples evenly instead of by time (0 or 1, default 0)
    pub sequential: Option<String>,
    /// Fill the area under each series (0 or 1, default 0)
    pub fill: Option<String>,
}

impl HistoryParams {
    pub fn options(&self) -> Result<ChartOptions, String> {
        chart_options(
            self.stacked.as_deref(),
            self.sequential.as_deref(),
            self.fill.as_deref(),
        )
    }
}

pub fn chart_options(
    stacked: Option<&str>,
    sequential: Option<&str>,
    fill: Option<&str>,
) -> Result<ChartOptions, String> {
    let defaults = ChartOptions::default();
    let mut problems = vec![];
    let mut flag = |name: &str, value: Option<&str>, default: bool| match parse_flag(value) {
        Some(parsed) => parsed.unwrap_or(default),
        None => {
            problems.push(format!("{} must be 0 or 1", name));
            default
        }
    };

    let options = ChartOptions {
        stacked: flag("stacked", stacked, defaults.stacked),
        sequential: flag("sequential", sequential, defaults.sequential),
        fill: flag("fill", fill, defaults.fill),
    };

    if problems.is_empty() {
        Ok(options)
    } else {
        Err(problems.join("; "))
    }
}

/// `None` for an unrecognized value, `Some(None)` when the flag is absent
fn parse_flag(value: Option<&str>) -> Option<Option<bool>> {
    match value.map(str::trim) {
        None | Some("") => Some(None),
        Some("1") | Some("true") => Some(Some(true)),
        Some("0") | Some("false") => Some(Some(false)),
        Some(_) => None,
    }
}

#[utoipa::path(
    get,
    path = "/history",
    params(HistoryParams),
    responses(
        (status = OK, description = "Active station counts per type for every aggregation run", body = HistoryChart),
        (status = BAD_REQUEST, description = "A rendering flag was not 0 or 1"),
        (status = INTERNAL_SERVER_ERROR, description = "History table could not be read")
    ))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryChart>, StatusReply> {
    let Query(params) = query.map_err(|rejection| malformed_request(rejection.body_text()))?;
    let options = params
        .options()
        .map_err(|msg| StatusReply::fail(StatusCode::BAD_REQUEST, msg))?;

    state
        .history
        .chart(options)
        .await
        .map(Json)
        .map_err(|e| StatusReply::storage_failure(&e))
}

/// Handler for the history page (GET /history/table)
pub async fn history_table_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryParams>, QueryRejection>,
) -> Html<String> {
    let options = query
        .map_err(|rejection| rejection.body_text())
        .and_then(|Query(params)| params.options());
    let chart = match options {
        Ok(options) => state.history.chart(options).await.map_err(|e| e.to_string()),
        Err(msg) => Err(msg),
    };

    Html(history_page(chart.as_ref().map_err(String::as_str)).into_string())
}
