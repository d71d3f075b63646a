// state.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fives_cache::Clock;
use fives_domain::AuditRepository;
use fives_insights::{DashboardService, LlmQuestionExtractor, QuestionExtractor};

use crate::{config::Config, error::ApiError};

/// Estado compartido por los handlers.
#[derive(Clone)]
pub struct AppState {
  pub repo: Arc<dyn AuditRepository>,
  pub dashboard: Arc<DashboardService>,
  pub clock: Arc<dyn Clock>,
  pub extractor: Arc<dyn QuestionExtractor>,
  pub config: Arc<Config>,
}

impl AppState {
  pub fn new(config: Config, repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>) -> Self {
    let extractor = LlmQuestionExtractor::new(config.llm_url.clone(), config.llm_api_key.clone(), config.llm_model.clone());
    Self::with_extractor(config, repo, clock, Arc::new(extractor))
  }

  pub fn with_extractor(config: Config, repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>,
                        extractor: Arc<dyn QuestionExtractor>)
                        -> Self {
    let dashboard = DashboardService::new(repo.clone(), clock.clone(), config.dashboard_ttl, config.lookup_ttl);
    Self { repo,
           dashboard: Arc::new(dashboard),
           clock,
           extractor,
           config: Arc::new(config) }
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Ejecuta `f` contra el repositorio en el pool de tareas bloqueantes.
  pub async fn with_repo<T, F>(&self, f: F) -> Result<T, ApiError>
    where T: Send + 'static,
          F: FnOnce(&dyn AuditRepository) -> Result<T, ApiError> + Send + 'static
  {
    let repo = self.repo.clone();
    blocking(move || f(repo.as_ref())).await
  }
}

pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
  where T: Send + 'static,
        F: FnOnce() -> Result<T, ApiError> + Send + 'static
{
  tokio::task::spawn_blocking(f).await
                                .map_err(|e| ApiError::Internal(format!("tarea bloqueante abortada: {}", e)))?
}
