use log::{error, info};
use tokio::sync::mpsc;

use sensorhub::config::HubConfig;
use sensorhub::error::HubResult;
use sensorhub::hub::{run_scheduler, HubServer, SystemClock};
use sensorhub::sensors::{spawn_sampler, SimulatedSource};
use sensorhub::telemetry::Aggregator;

const COMMAND_QUEUE_DEPTH: usize = 64;

async fn run(config: HubConfig) -> HubResult<()> {
    info!("Starting {} telemetry service", config.hub_name);

    let source = SimulatedSource::default()
        .with_seed(config.sim_seed)
        .with_fault_every(config.sim_fault_every);
    let (samples, sampler) = spawn_sampler(source, config.sample_interval);

    let server = HubServer::bind(&config).await?;
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let server_task = tokio::spawn(server.serve(command_tx));

    let aggregator = Aggregator::from_config(&config);
    let clock = SystemClock::new(config.utc_offset);
    let result = run_scheduler(aggregator, samples, command_rx, clock, config.tick_period()).await;

    server_task.abort();
    sampler.abort();

    let aggregator = result?;
    info!(
        "Scheduler stopped with {} history records",
        aggregator.history().len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match HubConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    // Run the hub or wait for shutdown signal
    tokio::select! {
        result = run(config) => {
            match result {
                Ok(_) => info!("Hub stopped"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(()) = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
