//! Main entry point for the upload validation server

use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use upload_core::{create_app, run_server, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!(
        "Upload ceilings: {} per file, {} per request, {} files",
        config.uploads.upload_max_filesize,
        config.uploads.post_max_size,
        config.uploads.max_file_uploads
    );
    for (field, rule) in &config.fields {
        info!(
            "Field '{}': required={}, extensions={:?}, max_size={:?}",
            field, rule.required, rule.allowed_extensions, rule.max_size
        );
    }

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let state = AppState::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize upload staging: {}", e))?;

    info!("App: {} v{}", state.app_name, state.version);

    let app = create_app(state);

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!(
                "{}={},upload_core={},tower_http=debug",
                env!("CARGO_CRATE_NAME").replace('-', "_"),
                default_level,
                default_level
            ).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
