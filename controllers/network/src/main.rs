//! Network Controller

use network_controller::config::ControllerConfig;
use network_controller::controller::Controller;
use network_controller::error::ControllerError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    // kube and reqwest both pull in rustls; pick the provider explicitly
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Network Controller");

    let config = ControllerConfig::from_env()?;
    config.log_summary();

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
