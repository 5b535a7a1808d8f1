//! Upload field validation: descriptors, the four upload checks, and the
//! axum service that stages multipart uploads and reports on them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod upload;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use handlers::routes::create_routes;
pub use upload::{
    AllowedExtensions, DenyAllProvenance, FieldReport, FieldRule, FileTable, IntakeLimits,
    SizeLimit, TempDirProvenance, UploadDescriptor, UploadErrorCode, UploadField,
    UploadProvenance, UploadStaging,
};

use axum::{extract::DefaultBodyLimit, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub config: Arc<AppConfig>,
    pub staging: Arc<UploadStaging>,
    /// Provenance for tables checked through `/api/uploads/check`. Never
    /// the staging area, so one request cannot vouch for another's files.
    pub check_provenance: Arc<dyn UploadProvenance>,
    pub limits: IntakeLimits,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let staging = match &config.uploads.temp_dir {
            Some(dir) => UploadStaging::new_in(dir)?,
            None => UploadStaging::new()?,
        };
        let limits = config.uploads.intake_limits()?;
        let check_provenance = check_provenance(&config, &staging)?;

        info!(
            staging_dir = %staging.root().display(),
            upload_max_filesize = %limits.max_file_size,
            max_file_uploads = limits.max_file_uploads,
            "upload staging initialized"
        );

        Ok(Self {
            app_name: "Upload Validator".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: Arc::new(config),
            staging: Arc::new(staging),
            check_provenance,
            limits,
        })
    }
}

fn check_provenance(
    config: &AppConfig,
    staging: &UploadStaging,
) -> Result<Arc<dyn UploadProvenance>> {
    let Some(dir) = &config.uploads.check_temp_dir else {
        info!("no check_temp_dir configured, checked tables never count as received");
        return Ok(Arc::new(DenyAllProvenance));
    };

    let provenance = TempDirProvenance::new(dir)?;
    if staging.root().starts_with(provenance.root()) {
        return Err(AppError::Config(::config::ConfigError::Message(format!(
            "uploads.check_temp_dir ({}) must not contain the staging directory ({})",
            provenance.root().display(),
            staging.root().display()
        ))));
    }

    Ok(Arc::new(provenance))
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .uploads
        .post_max_size()
        .map(|limit| usize::try_from(limit.bytes()).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);

    let router = Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    middleware::trace_requests(router)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
