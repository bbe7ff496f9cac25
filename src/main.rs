use anyhow::Result;
use solmate::config::Config;
use solmate::controller::{Controller, fixed_presence};
use solmate::points::MemoryPointBus;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    solmate::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    info!("Solmate charge controller starting up");

    // In a deployment the host platform provides the point bus; the
    // in-memory bus makes the binary runnable standalone.
    let bus = Arc::new(MemoryPointBus::new());

    let presence = fixed_presence(config.control.assume_car_present);
    let (controller, handle) = Controller::new(&config, bus, presence);

    let mut state_changes = handle.subscribe_state_changes();
    tokio::spawn(async move {
        while let Ok(change) = state_changes.recv().await {
            info!(
                "state changed: {} --{}--> {}",
                change.source, change.event, change.target
            );
        }
    });

    let controller_task = tokio::spawn(controller.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    handle.stop();

    match controller_task.await {
        Ok(Ok(())) => {
            info!("Controller shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Controller failed with error: {}", e);
            Err(anyhow::anyhow!("Controller error: {}", e))
        }
        Err(e) => Err(anyhow::anyhow!("Controller task panicked: {}", e)),
    }
}
