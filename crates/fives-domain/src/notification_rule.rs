// notification_rule.rs
use crate::record::{Drafted, Record, RecordKind};
use crate::user::Role;
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Umbral usado por `low_score` si la regla no define otro.
pub const DEFAULT_LOW_SCORE_THRESHOLD: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTrigger {
  ActionOverdue,
  AuditDueToday,
  LowScore,
}

/// Regla trigger → condición → destinatarios. No hay planificador: sólo se
/// evalúa desde el endpoint de prueba.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRule {
  pub id: Uuid,
  pub name: String,
  pub trigger: RuleTrigger,
  pub threshold: Option<u8>,
  pub target_role: Role,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl NotificationRule {
  pub fn effective_threshold(&self) -> u8 {
    self.threshold.unwrap_or(DEFAULT_LOW_SCORE_THRESHOLD)
  }
}

fn default_true() -> bool {
  true
}

fn default_target() -> Role {
  Role::Supervisor
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotificationRuleDraft {
  pub name: String,
  pub trigger: RuleTrigger,
  #[serde(default)]
  pub threshold: Option<u8>,
  #[serde(default = "default_target")]
  pub target_role: Role,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

impl Record for NotificationRule {
  const KIND: RecordKind = RecordKind::NotificationRule;

  fn id(&self) -> Uuid {
    self.id
  }
}

impl Drafted for NotificationRule {
  type Draft = NotificationRuleDraft;

  fn from_draft(draft: NotificationRuleDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let mut r = NotificationRule { id: Uuid::new_v4(),
                                   name: String::new(),
                                   trigger: draft.trigger,
                                   threshold: None,
                                   target_role: draft.target_role,
                                   is_active: true,
                                   created_at: now };
    r.apply_draft(draft, now)?;
    Ok(r)
  }

  fn apply_draft(&mut self, draft: NotificationRuleDraft, _now: DateTime<Utc>) -> Result<(), DomainError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
      return Err(DomainError::validation("el nombre de la regla no puede estar vacío"));
    }
    if let Some(t) = draft.threshold {
      if t > 100 {
        return Err(DomainError::validation("threshold fuera de rango [0,100]"));
      }
      if draft.trigger != RuleTrigger::LowScore {
        return Err(DomainError::validation("threshold sólo aplica a low_score"));
      }
    }
    self.name = name;
    self.trigger = draft.trigger;
    self.threshold = draft.threshold;
    self.target_role = draft.target_role;
    self.is_active = draft.is_active;
    Ok(())
  }
}
