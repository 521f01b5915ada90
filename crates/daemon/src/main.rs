use daemon::{get_config_info, setup_logger, RegistryClient};
use slog::{error, info, Logger};
use std::time::Duration;
use tokio::{signal, time::interval};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info();
    let logger = setup_logger(&cli);

    info!(logger, "Registry Daemon starting...");
    info!(logger, "  Registry URL: {}", cli.base_url());
    info!(logger, "  Interval: {} seconds", cli.interval());

    let client = RegistryClient::new(
        logger.clone(),
        cli.base_url(),
        cli.user_agent(),
        cli.timeout(),
    )?;

    if cli.once {
        // a single failed run is reported through the exit status
        client.run_once().await.map_err(|e| {
            error!(logger, "run failed: {}", e);
            anyhow::Error::from(e)
        })?;
        return Ok(());
    }

    run_on_schedule(&client, &logger, cli.interval()).await;
    info!(logger, "Registry Daemon stopped");
    Ok(())
}

/// Failed runs are logged and the next tick tries again from scratch.
async fn run_on_schedule(client: &RegistryClient, logger: &Logger, seconds: u64) {
    let mut ticker = interval(Duration::from_secs(seconds));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match client.run_once().await {
                    Ok(()) => info!(logger, "Finished run, waiting {} seconds for next run", seconds),
                    Err(err) => error!(logger, "Error running registry maintenance: {}", err),
                }
            }
            _ = signal::ctrl_c() => {
                info!(logger, "shutdown requested");
                break;
            }
        }
    }
}
