//! SitePulse Notifier — notification engine for construction projects.
//!
//! Main entry point that wires the crates together: database, email
//! transport, realtime gateway, command services and the background
//! engine scheduler.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use sitepulse_core::config::AppConfig;
use sitepulse_core::error::AppError;
use sitepulse_engine::{
    DeliveryDispatcher, EmailChannel, EmailRenderer, EmailTransport, NoopEmailTransport,
    NotificationCommandService, RetryManager, SmtpEmailTransport, TargetingResolver,
};
use sitepulse_worker::checks::{
    AttendanceCheck, DigestCheck, EngineCheck, IncidentBacklogCheck, MachineryCheck,
    ProjectReviewCheck, RetryCheck, StockCheck,
};
use sitepulse_worker::EngineRunner;

#[tokio::main]
async fn main() {
    let env = std::env::var("SITEPULSE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Notifier error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SitePulse Notifier v{}", env!("CARGO_PKG_VERSION"));

    // ── Database connection + migrations ─────────────────────────
    tracing::info!("Connecting to database...");
    let pool = sitepulse_database::connection::create_pool(&config.database).await?;
    sitepulse_database::migration::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    // ── Stores ───────────────────────────────────────────────────
    let notifications = Arc::new(
        sitepulse_database::repositories::notification::PgNotificationStore::new(pool.clone()),
    );
    let deliveries = Arc::new(
        sitepulse_database::repositories::delivery::PgDeliveryStore::new(pool.clone()),
    );
    let preferences = Arc::new(
        sitepulse_database::repositories::preference::PgPreferenceStore::new(pool.clone()),
    );

    // ── Context facades ──────────────────────────────────────────
    let users = Arc::new(sitepulse_facade::PgUserFacade::new(pool.clone()));
    let projects = Arc::new(sitepulse_facade::PgProjectFacade::new(pool.clone()));
    let materials = Arc::new(sitepulse_facade::PgMaterialFacade::new(pool.clone()));
    let machinery = Arc::new(sitepulse_facade::PgMachineryFacade::new(pool.clone()));
    let incidents = Arc::new(sitepulse_facade::PgIncidentFacade::new(pool.clone()));
    let personnel = Arc::new(sitepulse_facade::PgPersonnelFacade::new(pool.clone()));
    let settings = Arc::new(sitepulse_facade::PgSettingsFacade::new(pool));

    // ── Realtime gateway ─────────────────────────────────────────
    let gateway = Arc::new(sitepulse_realtime::RealtimeGateway::new(
        config.realtime.clone(),
    ));

    // ── Email channel ────────────────────────────────────────────
    let transport: Arc<dyn EmailTransport> = if config.email.enabled {
        Arc::new(SmtpEmailTransport::new(&config.email)?)
    } else {
        tracing::info!("Email transport disabled, outbound email will be logged only");
        Arc::new(NoopEmailTransport)
    };
    let email = Arc::new(EmailChannel::new(
        users.clone(),
        projects.clone(),
        settings.clone(),
        EmailRenderer::new(&config.email.site_url),
        transport,
    ));

    // ── Notification services ────────────────────────────────────
    let resolver = Arc::new(TargetingResolver::new(
        users.clone(),
        projects.clone(),
        settings.clone(),
    ));
    let dispatcher = Arc::new(DeliveryDispatcher::new(
        deliveries.clone(),
        preferences,
        gateway.clone(),
        email.clone(),
    ));
    let service = Arc::new(NotificationCommandService::new(
        notifications.clone(),
        users.clone(),
        resolver,
        dispatcher,
        gateway.clone(),
    ));
    let retry_manager = Arc::new(RetryManager::new(
        deliveries,
        notifications.clone(),
        email.clone(),
        config.engine.max_delivery_attempts as i32,
    ));

    // ── Engine checks ────────────────────────────────────────────
    let thresholds = config.engine.thresholds.clone();
    let checks: Vec<Arc<dyn EngineCheck>> = vec![
        Arc::new(StockCheck::new(
            service.clone(),
            projects.clone(),
            materials,
            thresholds.clone(),
        )),
        Arc::new(MachineryCheck::new(
            service.clone(),
            projects.clone(),
            machinery,
            thresholds.clone(),
        )),
        Arc::new(IncidentBacklogCheck::new(
            service.clone(),
            projects.clone(),
            incidents,
            thresholds.clone(),
        )),
        Arc::new(AttendanceCheck::new(
            service.clone(),
            projects.clone(),
            personnel,
            thresholds,
        )),
        Arc::new(ProjectReviewCheck::new(service.clone(), projects)),
        Arc::new(RetryCheck::new(retry_manager)),
        Arc::new(DigestCheck::new(
            notifications,
            users,
            settings,
            email,
            config.engine.digest.clone(),
            config.engine.retention_days,
        )),
    ];

    // ── Shutdown channel + engine scheduler ──────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = EngineRunner::new(config.engine.clone(), checks, shutdown_rx);
    let engine_handle = tokio::spawn(runner.run());
    tracing::info!("Engine scheduler started");

    // ── Realtime endpoint ────────────────────────────────────────
    let app = sitepulse_realtime::server::router(gateway);
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("SitePulse Notifier listening on {}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Waiting for the engine scheduler to stop...");
    let _ = tokio::time::timeout(std::time::Duration::from_secs(30), engine_handle).await;

    tracing::info!("SitePulse Notifier shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
