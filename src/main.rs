use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use image_classifier::{shutdown_signal, ClassifierService};
use service_config::ConfigManager;

/// Image classification HTTP service
#[derive(Parser, Debug)]
#[command(name = "image-classifier", version, about)]
struct Cli {
    /// Configuration file (defaults to config/default.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    
    /// Bind host
    #[arg(long)]
    host: Option<String>,
    
    /// Bind port
    #[arg(long)]
    port: Option<u16>,
    
    /// Model artifact path
    #[arg(long)]
    model_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };
    let source = manager.source().map(|p| p.display().to_string());
    
    let mut config = manager.into_config();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(path) = cli.model_path {
        config.model.path = path;
    }
    let config = ConfigManager::from_config(config)?.into_config();
    
    logging::init(&config.logging)?;
    info!(
        "Configuration loaded from {}",
        source.as_deref().unwrap_or("defaults and environment")
    );
    
    let service = match ClassifierService::new(config) {
        Ok(service) => service,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };
    
    service.run(shutdown_signal()).await
}
