// error.rs
use axum::{
  extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts,
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use fives_domain::DomainError;
use fives_insights::InsightsError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errores de la API. Cada variante fija el código HTTP; el cuerpo es
/// siempre `{"error": "<mensaje>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  Unauthorized(String),
  #[error("{0}")]
  Forbidden(String),
  #[error("{0}")]
  NotFound(String),
  /// Fallo de un servicio externo o de configuración: el mensaje llega al
  /// cliente.
  #[error("{0}")]
  Service(String),
  /// Fallo interno: se registra y el cliente recibe un mensaje genérico.
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn forbidden(msg: impl Into<String>) -> Self {
    Self::Forbidden(msg.into())
  }

  pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{} {} no encontrado", what, id))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Service(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match self {
      ApiError::Internal(detail) => {
        error!(%detail, "error interno");
        "Error interno del servidor".to_string()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<DomainError> for ApiError {
  fn from(e: DomainError) -> Self {
    match e {
      DomainError::ValidationError(m) | DomainError::SerializationError(m) => ApiError::BadRequest(m),
      DomainError::NotFound(m) => ApiError::NotFound(m),
      DomainError::StorageError(m) => ApiError::Internal(m),
    }
  }
}

impl From<InsightsError> for ApiError {
  fn from(e: InsightsError) -> Self {
    match e {
      InsightsError::Domain(d) => d.into(),
      InsightsError::Extraction(m) => ApiError::BadRequest(m),
      other @ (InsightsError::Upstream(_) | InsightsError::Config(_)) => ApiError::Service(other.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

/// `Json` con rechazo en formato `{"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
  fn into_response(self) -> Response {
    Json(self.0).into_response()
  }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::to_bytes;

  async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn domain_errors_map_to_status_codes() {
    let (status, body) = body_of(DomainError::validation("título vacío").into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "título vacío");
    let (status, _) = body_of(DomainError::not_found("zona", "x").into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn internal_details_are_not_leaked() {
    let (status, body) = body_of(DomainError::StorageError("disk I/O error en /var/db".into()).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error interno del servidor");
  }

  #[tokio::test]
  async fn upstream_failures_keep_their_message() {
    let (status, body) = body_of(InsightsError::Config("FIVES_LLM_API_KEY no está definida".into()).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("FIVES_LLM_API_KEY"));
  }
}
