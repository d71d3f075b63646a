//! Servidor HTTP de auditorías 5S sobre axum.
//!
//! - Autenticación por API key (`Authorization: Bearer ...`).
//! - Handlers finos: validan, llaman al repositorio en `spawn_blocking` e
//!   invalidan la cache del dashboard tras cada escritura.
//! - Errores homogéneos `{"error": "..."}` (ver `error::ApiError`).
use std::{sync::Arc, time::Duration};

use axum::{
  extract::DefaultBodyLimit,
  http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
  },
  routing::get,
  Json, Router,
};
use chrono::{DateTime, Utc};
use fives_domain::{AuditRepository, DomainError, InMemoryAuditRepository, NewUser, Role};
use fives_persistence::DieselAuditRepository;
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Fotos en base64 y PDFs viajan en el cuerpo.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
  let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                             .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                             .max_age(Duration::from_secs(60 * 60));

  Router::new().route("/health", get(health))
               .nest("/api", routes::api_router())
               .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
               .layer(TraceLayer::new_for_http())
               .layer(cors)
               .with_state(state)
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

/// Store Diesel si hay `DATABASE_URL`; si no, en memoria.
pub fn open_repository(config: &Config) -> Result<Arc<dyn AuditRepository>, DomainError> {
  match &config.database_url {
    Some(url) => {
      info!("Usando almacenamiento Diesel");
      Ok(Arc::new(DieselAuditRepository::new(url)?))
    }
    None => {
      info!("DATABASE_URL no definida, almacenamiento en memoria");
      Ok(Arc::new(InMemoryAuditRepository::new()))
    }
  }
}

/// Con el store vacío crea un admin. Devuelve la key sólo cuando se ha
/// generado aquí (no venía en la configuración).
pub fn bootstrap_admin(repo: &dyn AuditRepository, api_key: Option<&str>, now: DateTime<Utc>)
                       -> Result<Option<String>, DomainError> {
  if !repo.list_users()?.is_empty() {
    return Ok(None);
  }
  let (key, generated) = match api_key {
    Some(k) => (k.to_string(), false),
    None => (format!("fives-{}", Uuid::new_v4().simple()), true),
  };
  let admin = NewUser { username: "admin".into(),
                        display_name: Some("Administrador".into()),
                        email: None,
                        role: Role::Admin,
                        team_id: None,
                        zone_ids: Vec::new(),
                        language: "en".into(),
                        theme: "light".into(),
                        api_key: key.clone() }.into_user(now)?;
  repo.save_user(admin)?;
  info!("Usuario admin inicial creado");
  Ok(generated.then_some(key))
}

pub async fn start_server(state: AppState) -> std::io::Result<()> {
  let address = format!("0.0.0.0:{}", state.config.port);
  let app = build_router(state);

  info!("Binding to {address}");
  let listener = TcpListener::bind(&address).await?;
  info!("Server running on {address}");

  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!("Server shutting down...");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if signal::ctrl_c().await.is_ok() {
      info!("Received Ctrl+C, shutting down");
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
        info!("Received terminate signal, shutting down");
      }
      Err(_) => std::future::pending::<()>().await,
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
