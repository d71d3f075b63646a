use std::sync::Arc;

use fives_api::{bootstrap_admin, open_repository, start_server, AppState, Config};
use fives_cache::{Clock, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Servidor de auditorías 5S.
///
/// Variables relevantes: `FIVES_PORT`, `DATABASE_URL` (sin ella, memoria),
/// `FIVES_ADMIN_API_KEY`, `FIVES_LLM_*` y `RUST_LOG`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let config = Config::load();
    let repo = open_repository(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Some(key) = bootstrap_admin(repo.as_ref(), config.admin_api_key.as_deref(), clock.now())? {
        warn!("Admin inicial creado con API key generada (guárdala, no se mostrará de nuevo): {key}");
    }

    info!("Initializing state...");
    let state = AppState::new(config, repo, clock);
    start_server(state).await?;
    Ok(())
}
