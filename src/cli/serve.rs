//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{ConduitConfig, LogFormat};
use crate::service::RouterService;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<ConduitConfig, Box<dyn std::error::Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        ConduitConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        ConduitConfig::default()
    };

    config = config.with_env_overrides();

    // CLI overrides win
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel `cancel_token`.
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!("Starting Conduit router");
    tracing::debug!(?config, "Loaded configuration");

    // Cancelling this token ends every metrics stream with a shutdown notice
    let cancel_token = CancellationToken::new();
    let service = Arc::new(RouterService::new(&config, cancel_token.clone())?);
    tracing::info!(
        backends = service.registry().backend_count(),
        "Router service ready"
    );

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(Arc::clone(&service), Arc::clone(&config)));
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Conduit API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    service.shutdown();
    tracing::info!("Conduit router stopped");
    Ok(())
}
