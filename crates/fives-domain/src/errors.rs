// errors.rs
use thiserror::Error;

/// Errores del dominio de auditorías 5S.
///
/// - `ValidationError`: datos de entrada inválidos o referencia rota.
/// - `NotFound`: la entidad pedida no existe.
/// - `StorageError`: fallo del almacenamiento (BD, mutex envenenado...).
/// - `SerializationError`: fallo al (de)serializar JSON.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error de almacenamiento: {0}")]
  StorageError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl DomainError {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::ValidationError(msg.into())
  }

  pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{} {}", what, id))
  }
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, DomainError>;
