// message.rs
use crate::record::{Record, RecordKind};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mensaje interno entre usuarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id: Uuid,
  pub sender_id: Uuid,
  pub recipient_id: Uuid,
  pub subject: String,
  pub body: String,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

impl Message {
  pub fn new(sender_id: Uuid, draft: MessageDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let subject = draft.subject.trim().to_string();
    if subject.is_empty() {
      return Err(DomainError::validation("el asunto no puede estar vacío"));
    }
    if draft.body.trim().is_empty() {
      return Err(DomainError::validation("el cuerpo del mensaje no puede estar vacío"));
    }
    Ok(Message { id: Uuid::new_v4(),
                 sender_id,
                 recipient_id: draft.recipient_id,
                 subject,
                 body: draft.body,
                 is_read: false,
                 created_at: now })
  }

  pub fn involves(&self, user_id: Uuid) -> bool {
    self.sender_id == user_id || self.recipient_id == user_id
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageDraft {
  pub recipient_id: Uuid,
  pub subject: String,
  pub body: String,
}

/// Lo único editable de un mensaje es su marca de lectura.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageUpdate {
  pub is_read: bool,
}

impl Record for Message {
  const KIND: RecordKind = RecordKind::Message;

  fn id(&self) -> Uuid {
    self.id
  }
}
