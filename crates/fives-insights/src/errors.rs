use fives_domain::DomainError;
use thiserror::Error;

/// Errores de los servicios de lectura y utilidades (dashboard, informes,
/// extracción de preguntas).
#[derive(Debug, Error)]
pub enum InsightsError {
  #[error(transparent)]
  Domain(#[from] DomainError),
  #[error("Error de extracción: {0}")]
  Extraction(String),
  #[error("Error del proveedor externo: {0}")]
  Upstream(String),
  #[error("Configuración incompleta: {0}")]
  Config(String),
}
