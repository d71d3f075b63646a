// tag.rs
use crate::record::{Drafted, Record, RecordKind};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
  pub id: Uuid,
  pub name: String,
  /// "#RRGGBB"
  pub color: String,
  pub created_at: DateTime<Utc>,
}

fn default_color() -> String {
  "#6b7280".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagDraft {
  pub name: String,
  #[serde(default = "default_color")]
  pub color: String,
}

fn is_hex_color(c: &str) -> bool {
  c.len() == 7 && c.starts_with('#') && c[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}

impl Record for Tag {
  const KIND: RecordKind = RecordKind::Tag;

  fn id(&self) -> Uuid {
    self.id
  }
}

impl Drafted for Tag {
  type Draft = TagDraft;

  fn from_draft(draft: TagDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let mut t = Tag { id: Uuid::new_v4(), name: String::new(), color: String::new(), created_at: now };
    t.apply_draft(draft, now)?;
    Ok(t)
  }

  fn apply_draft(&mut self, draft: TagDraft, _now: DateTime<Utc>) -> Result<(), DomainError> {
    let name = draft.name.trim().to_lowercase();
    if name.is_empty() {
      return Err(DomainError::validation("el nombre de la etiqueta no puede estar vacío"));
    }
    if !is_hex_color(&draft.color) {
      return Err(DomainError::validation(format!("color inválido: {}", draft.color)));
    }
    self.name = name;
    self.color = draft.color.to_lowercase();
    Ok(())
  }
}
