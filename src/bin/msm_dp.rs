use anyhow::Result;
use clap::Parser;
use msm_dataplane::config::Config;
use msm_dataplane::dataplane::{Bindings, DataPlane, shutdown_signal};
use msm_dataplane::discovery::LocalAddressProvider;
use msm_dataplane::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init(config.log_format);
    config.validate()?;

    info!(
        port = config.port,
        rtp_port = config.rtp_port,
        discovery = ?config.discovery,
        "Starting data plane"
    );

    // Only used for bookkeeping, so a failed lookup is not fatal.
    let local_address = match config.discovery().await {
        Ok(provider) => provider.local_address().await.unwrap_or_else(|e| {
            warn!(error = %e, "Local address discovery failed");
            None
        }),
        Err(e) => {
            warn!(error = %e, "Local address discovery unavailable");
            None
        }
    };
    info!(local_address = ?local_address, "Local address resolved");

    let dataplane = DataPlane::bind(Bindings::from(&config), local_address).await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down...");
        trigger.cancel();
    });

    dataplane.run(shutdown).await
}
