// record.rs
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Entidades auxiliares que el repositorio guarda como documentos JSON
/// tipados (una tabla lógica por tipo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
  Schedule,
  Question,
  NotificationRule,
  Tag,
  Message,
  Report,
}

impl RecordKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      RecordKind::Schedule => "schedule",
      RecordKind::Question => "question",
      RecordKind::NotificationRule => "notification_rule",
      RecordKind::Tag => "tag",
      RecordKind::Message => "message",
      RecordKind::Report => "report",
    }
  }
}

impl fmt::Display for RecordKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RecordKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "schedule" => Ok(RecordKind::Schedule),
      "question" => Ok(RecordKind::Question),
      "notification_rule" => Ok(RecordKind::NotificationRule),
      "tag" => Ok(RecordKind::Tag),
      "message" => Ok(RecordKind::Message),
      "report" => Ok(RecordKind::Report),
      other => Err(DomainError::validation(format!("tipo de registro desconocido: {}", other))),
    }
  }
}

/// Registro persistible por `save_record`/`get_record`.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
  const KIND: RecordKind;

  fn id(&self) -> Uuid;

  /// Zonas referenciadas (el llamador verifica que existan).
  fn referenced_zones(&self) -> Vec<Uuid> {
    Vec::new()
  }

  /// Equipos referenciados.
  fn referenced_teams(&self) -> Vec<Uuid> {
    Vec::new()
  }
}

/// Registro con CRUD genérico: se crea y se reemplaza (PUT) a partir de un
/// borrador validado.
pub trait Drafted: Record {
  type Draft: DeserializeOwned + Send + 'static;

  fn from_draft(draft: Self::Draft, now: DateTime<Utc>) -> Result<Self, DomainError>;

  /// Reemplaza los campos editables conservando id y fecha de alta.
  fn apply_draft(&mut self, draft: Self::Draft, now: DateTime<Utc>) -> Result<(), DomainError>;

  /// Anota al autor cuando el tipo lo registra.
  fn set_author(&mut self, _user_id: Uuid) {}
}
