//! Tienda storefront binary.
//!
//! Serves registration, login, the personal area and the administration pages.
//!
//! # Architecture
//!
//! - Axum web framework with Askama templates for server-side rendering
//! - `PostgreSQL` for users, administrators, clients and catalogs
//! - tower-sessions with a `PostgreSQL` store for login state and cached lists

#![cfg_attr(not(test), forbid(unsafe_code))]

use sentry::integrations::tracing as sentry_tracing;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::{self, Repositories};
use tienda_storefront::state::AppState;

/// Start Sentry when a DSN is configured; the guard flushes events on drop.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            traces_sample_rate: config.sentry.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Console output filtered by `RUST_LOG`, with warnings and errors forwarded
/// to Sentry as events and info/debug lines kept as breadcrumbs.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tienda_storefront=info,tower_http=debug".into());

    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| {
        use sentry_tracing::EventFilter;
        match *metadata.level() {
            tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
            tracing::Level::INFO | tracing::Level::DEBUG => EventFilter::Breadcrumb,
            _ => EventFilter::Ignore,
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    // Sentry goes first so the tracing layer has a client to report to.
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    // Schema changes are applied by `tienda-cli migrate`, never here.
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let store = PostgresStore::new(pool.clone());
    let state = AppState::new(config.clone(), Repositories::postgres(&pool));

    let app = tienda_storefront::app(state, store)
        // Outermost, so every request gets its own hub.
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!(%addr, base_url = %config.base_url, "Tienda storefront listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
