// src/main.rs - Headless fleet monitor
use std::sync::Arc;

use clap::Parser;
use printfleet::communication::http::HttpTransport;
use printfleet::communication::socket::SocketChannel;
use printfleet::config::{self, Config};
use printfleet::file_manager::FileManager;
use printfleet::notify::LogNotifier;
use printfleet::{EventBus, FleetApi, FleetRegistry, JobTimer, LiveState, Notifier, Registry};

#[derive(Debug, Parser)]
#[command(name = "fleet-monitor", about = "Follow a 3D-printer fleet's live status")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "fleet.toml")]
    config: String,
    /// Print the fleet once and exit instead of following live updates
    #[arg(long)]
    once: bool,
}

fn load(path: &str) -> Result<Config, config::ConfigError> {
    match config::load_config(path) {
        Ok(config) => Ok(config),
        Err(config::ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("Config '{}' not found, using defaults", path);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

fn log_fleet(registry: &FleetRegistry) {
    for device in registry.snapshot() {
        tracing::info!(
            "Printer {} '{}' [{}] queue={} error={}",
            device.id,
            device.name,
            device.status,
            device.queue.len(),
            device.error.as_deref().unwrap_or("-")
        );
        for job in &device.queue {
            tracing::info!(
                "  job {} '{}' [{}] progress={:.1}%",
                job.id,
                job.name,
                job.status,
                job.progress.unwrap_or(0.0)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();
    let config = load(&args.config)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(config.logging.max_level()?)
        .init();

    tracing::info!("Starting fleet monitor");
    tracing::info!("Service: {}", config.server.base_url);
    tracing::info!("Push channel: {}", config.server.socket_url);

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let transport = Arc::new(HttpTransport::new(&config.server)?);
    let api = FleetApi::new(
        transport,
        notifier.clone(),
        FileManager::new(config.downloads.directory.clone()),
    );

    let registry = Arc::new(FleetRegistry::new());
    match api.printer_info().await {
        Some(devices) => registry.replace_all(devices),
        None => tracing::warn!("Starting with an empty fleet"),
    }
    log_fleet(&registry);
    if args.once {
        return Ok(());
    }

    let bus = EventBus::new();
    let shared: Arc<dyn Registry> = registry.clone();
    let live = LiveState::attach(&bus, shared.clone());
    let timer = JobTimer::new(shared, notifier, config.tracker.clone());
    let timer_subscriptions = timer.attach(&bus);

    let socket = SocketChannel::new(&config.server, bus.clone()).spawn();
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down fleet monitor");

    socket.abort();
    live.teardown();
    for subscription in timer_subscriptions {
        subscription.unsubscribe();
    }
    timer.shutdown();
    log_fleet(&registry);
    Ok(())
}
