mod api;
mod router;
mod startup;
mod state;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    netsoc_core::config::load_dotenv();
    let config = netsoc_core::Config::from_env();
    config.log_summary();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let port = config.server.port;

    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://localhost:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
