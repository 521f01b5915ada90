use crate::{
    db, history, listing, routes, Database, FileAccess, FileData, HistoryService,
    ListingPublisher, Registrar, RegistryConfig, StationData, ValidationRules,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RegistryConfig>,
    pub store: Arc<dyn StationData>,
    pub registrar: Arc<Registrar>,
    pub listing: Arc<ListingPublisher>,
    pub history: Arc<HistoryService>,
}

impl AppState {
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn StationData>,
        files: Arc<dyn FileData>,
    ) -> Self {
        let config = Arc::new(config);
        let registrar = Arc::new(Registrar::new(
            store.clone(),
            files.clone(),
            ValidationRules::from(config.as_ref()),
        ));
        let listing = Arc::new(ListingPublisher::new(
            store.clone(),
            files,
            config.clone(),
        ));
        let history = Arc::new(HistoryService::new(store.clone(), config.clone()));

        Self {
            config,
            store,
            registrar,
            listing,
            history,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::register::register_get,
        routes::register::register_post,
        routes::history::history,
        routes::stations::active_stations,
        routes::stations::health,
    ),
    components(
        schemas(
            routes::register::RegisterParams,
            db::StationRecord,
            db::HistorySample,
            listing::Listing,
            history::ChartOptions,
            history::HistorySeries,
            history::HistoryChart,
        )
    ),
    tags(
        (name = "weather station registry api", description = "collects weather station check-ins and publishes the list of active stations")
    )
)]
struct ApiDoc;

/// Open the station database under `config.db_dir` and wire up the services.
/// The database handle is returned too so the caller can checkpoint it on shutdown.
pub async fn build_app_state(
    config: RegistryConfig,
) -> Result<(AppState, Database), anyhow::Error> {
    let db = Database::new(&config.db_dir)
        .await
        .map_err(|e| anyhow!("error setting up SQLite database: {}", e))?;
    let files = Arc::new(FileAccess::new(
        config.static_dir.clone(),
        config.record_log.clone(),
    ));

    let state = AppState::new(config, Arc::new(db.clone()), files);
    Ok((state, db))
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let serve_static = ServeDir::new(&app_state.config.static_dir);
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    let register = get(routes::register_get)
        .post(routes::register_post)
        .fallback(routes::unsupported_method);

    Router::new()
        // Station check-ins and maintenance actions
        .route("/register", register.clone())
        .route(
            &format!("/register/{}", crate::LEGACY_REGISTER_PATH),
            register,
        )
        // History
        .route("/history", get(routes::history))
        .route("/history/table", get(routes::history_table_handler))
        // API routes
        .route("/api/stations", get(routes::active_stations))
        .route("/health", get(routes::health))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .fallback_service(serve_static)
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
