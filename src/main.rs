use std::env;
use std::path::PathBuf;

use tokio::net::TcpListener;

use anyhow::anyhow;

use callrelay::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, honouring RUST_LOG
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Handle CLI arguments
    let mut config_path: Option<PathBuf> = None;
    let mut args = env::args();
    let _ = args.next();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => {
                anyhow::bail!("Unknown argument '{other}'. Usage: callrelay [--config <file>]");
            }
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();
    tracing::info!(
        address = %address,
        public_host = ?config.public_host,
        twilio = config.has_twilio_api(),
        "Starting server"
    );

    // Create application state
    let app_state = AppState::new(config).await;
    let app = routes::create_router(app_state);

    // Create listener
    let listener = TcpListener::bind(&address).await?;

    tracing::info!("Server listening on {address}");

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
