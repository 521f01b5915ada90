use anyhow::anyhow;
use axum::serve;
use log::{error, info, warn};
use registry::{
    app, build_app_state, get_config_info, get_log_level, setup_logger, RegistryConfig,
};
use station_registry_core::create_dir_all;
use std::{net::SocketAddr, str::FromStr};
use time::OffsetDateTime;
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    let log_level = get_log_level(&cli);

    setup_logger(cli.log_file.as_deref())?
        .level(log_level)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("registry", log_level)
        .level_for("http_response", log_level)
        .level_for("http_request", log_level)
        .apply()?;

    let config = RegistryConfig::from_cli(&cli).map_err(|e| {
        error!("invalid configuration: {}", e);
        anyhow!("invalid configuration: {}", e)
    })?;

    create_dir_all(&config.static_dir)?;
    if let Some(parent) = config.record_log.as_ref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let host = cli.host();
    let port = cli.port();
    let socket_addr = SocketAddr::from_str(&format!("{}:{}", host, port))
        .map_err(|e| anyhow!("invalid address: {}", e))?;

    let listener = TcpListener::bind(socket_addr)
        .await
        .map_err(|e| anyhow!("error binding to socket: {}", e))?;

    info!("Station Registry starting...");
    info!("  Listen: http://{}", socket_addr);
    info!("  Docs:   http://{}/docs", socket_addr);
    info!("  Public URL: {}", config.remote_url);
    info!("  Database dir: {}", config.db_dir);
    info!("  Static: {}", config.static_dir.display());
    info!("  Stale after: {}", config.retention_text());

    let (app_state, db) = build_app_state(config).await.map_err(|e| {
        error!("error building app: {}", e);
        e
    })?;

    // the static listing should exist before the first request for it
    if let Err(e) = app_state.listing.publish(OffsetDateTime::now_utc()).await {
        warn!("initial station listing not published: {}", e);
    }

    let app = app(app_state);

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.checkpoint().await;
    info!("Station Registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
