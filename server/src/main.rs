use devhub::{routes, setup, state::AppState};
use tracing::info;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Initialize Sentry for error tracking
    let _sentry_guard = setup::setup_sentry();

    // Create and run the tokio runtime
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> color_eyre::Result<()> {
    setup::setup_tracing(env!("CARGO_CRATE_NAME"))?;

    info!("Starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let app_state = AppState::from_env().await?;
    let port = setup::port_from_env()?;

    setup::run_server(routes::routes(app_state), port).await
}
