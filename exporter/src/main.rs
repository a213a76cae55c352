use exporter::app::App;
use exporter::config::AppConfig;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = AppConfig::load().unwrap_or_else(|err| {
        eprintln!("Failed to load settings: {err}");
        process::exit(1);
    });

    // Install global log collector.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new(exporter::config::DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Run the exporter with the loaded settings.
    App { config }.start().await.unwrap_or_else(|err| {
        error!("{}", err);
        process::exit(1);
    });
}
