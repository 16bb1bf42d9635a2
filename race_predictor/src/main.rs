use race_predictor::{config::ServiceConfig, routes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env()?;
    let sim = cfg.load_simulator()?;
    if sim.tables().find_track(&cfg.default_track).is_none() {
        tracing::warn!("DEFAULT_TRACK {} is not in the grid; requests must name a track", cfg.default_track);
    }
    let state = routes::AppState::new(sim, &cfg.default_track, cfg.default_simulations, cfg.workers);
    let app = routes::router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
