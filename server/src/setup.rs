use std::net::SocketAddr;

use axum::Router;
use color_eyre::eyre::WrapErr as _;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};
use tracing_tree::HierarchicalLayer;

pub const DEFAULT_PORT: u16 = 3000;

/// Starts Sentry when `SENTRY_DSN` is set. Keep the guard alive for the whole process.
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    )))
}

/// Installs the global subscriber: env filter, indented tree output, and Sentry breadcrumbs
pub fn setup_tracing(crate_name: &str) -> color_eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("info,{crate_name}=debug")))
        .wrap_err("Failed to build tracing filter")?;

    let tree_layer = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tree_layer)
        .with(sentry::integrations::tracing::layer())
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(())
}

/// The port from `PORT`, or the default
pub fn port_from_env() -> color_eyre::Result<u16> {
    match std::env::var("PORT") {
        Ok(port) => port
            .parse()
            .wrap_err_with(|| format!("PORT is not a valid port number: {}", port)),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

/// Serves the router until ctrl-c
pub async fn run_server(app: Router, port: u16) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}
