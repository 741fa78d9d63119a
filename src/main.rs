// Symptom Trace - HTTP server entry point

use symptom_trace::storage::ConfigService;
use symptom_trace::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("symptom_trace=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service = ConfigService::load()?;
    match service.config_path() {
        Some(path) => tracing::info!("[Main] config loaded from {}", path.display()),
        None => tracing::info!("[Main] no config file, using defaults and environment"),
    }
    let bind_addr = service.get_config().bind_addr.clone();
    let config = service.into_config();
    let state = AppState::initialize(config)?;
    tracing::info!("[Main] {:?}", state);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("[Main] symptom-trace listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
