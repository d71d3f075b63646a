// audit.rs
use crate::checklist::{checklist_score, ChecklistItem, NewChecklistItem};
use crate::patch::{apply, clean, double_option};
use crate::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
  Scheduled,
  InProgress,
  Completed,
}

impl AuditStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      AuditStatus::Scheduled => "scheduled",
      AuditStatus::InProgress => "in_progress",
      AuditStatus::Completed => "completed",
    }
  }
}

impl fmt::Display for AuditStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AuditStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "scheduled" => Ok(AuditStatus::Scheduled),
      "in_progress" => Ok(AuditStatus::InProgress),
      "completed" => Ok(AuditStatus::Completed),
      other => Err(DomainError::validation(format!("estado de auditoría desconocido: {}", other))),
    }
  }
}

/// Ventana [inicio, inicio + 24h) del día UTC que contiene `now`.
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
  let start = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
  (start, start + Duration::hours(24))
}

/// Una inspección 5S de una zona. Sus `ChecklistItem` viven aparte y se
/// borran en cascada con ella.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
  pub id: Uuid,
  pub title: String,
  pub zone_id: Uuid,
  pub auditor_id: Option<Uuid>,
  pub status: AuditStatus,
  pub scheduled_date: DateTime<Utc>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub overall_score: Option<u8>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Audit {
  /// ¿Programada dentro del día UTC de `now`?
  pub fn is_scheduled_on_day_of(&self, now: DateTime<Utc>) -> bool {
    let (start, end) = day_window(now);
    self.scheduled_date >= start && self.scheduled_date < end
  }

  pub fn is_completed(&self) -> bool {
    self.status == AuditStatus::Completed
  }

  /// Transición de estado. Sólo hacia delante; repetir el estado actual es
  /// un no-op. Al completar sin puntuación se deriva de los ítems.
  pub fn transition(&mut self, to: AuditStatus, items: &[ChecklistItem], now: DateTime<Utc>) -> Result<(), DomainError> {
    if to == self.status {
      return Ok(());
    }
    if to < self.status {
      return Err(DomainError::validation(format!("transición inválida {} -> {}", self.status, to)));
    }
    match to {
      AuditStatus::InProgress => {
        self.started_at = Some(now);
      }
      AuditStatus::Completed => {
        if self.started_at.is_none() {
          self.started_at = Some(now);
        }
        self.completed_at = Some(now);
        if self.overall_score.is_none() {
          self.overall_score = Some(checklist_score(items));
        }
      }
      AuditStatus::Scheduled => {}
    }
    self.status = to;
    Ok(())
  }
}

fn validate_score(score: Option<u8>) -> Result<(), DomainError> {
  match score {
    Some(s) if s > 100 => Err(DomainError::validation(format!("overallScore fuera de rango [0,100]: {}", s))),
    _ => Ok(()),
  }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
  if title.is_empty() {
    return Err(DomainError::validation("el título de la auditoría no puede estar vacío"));
  }
  Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAudit {
  pub title: String,
  pub zone_id: Uuid,
  #[serde(default)]
  pub auditor_id: Option<Uuid>,
  pub scheduled_date: DateTime<Utc>,
  #[serde(default)]
  pub notes: Option<String>,
  /// `None`: el checklist se siembra con las preguntas activas de la zona.
  #[serde(default)]
  pub items: Option<Vec<NewChecklistItem>>,
}

impl NewAudit {
  /// Construye la auditoría (estado `scheduled`) y sus ítems explícitos, si
  /// los hay.
  pub fn into_audit(self, now: DateTime<Utc>) -> Result<(Audit, Option<Vec<ChecklistItem>>), DomainError> {
    let title = self.title.trim().to_string();
    validate_title(&title)?;
    let audit = Audit { id: Uuid::new_v4(),
                        title,
                        zone_id: self.zone_id,
                        auditor_id: self.auditor_id,
                        status: AuditStatus::Scheduled,
                        scheduled_date: self.scheduled_date,
                        started_at: None,
                        completed_at: None,
                        overall_score: None,
                        notes: clean(self.notes),
                        created_at: now };
    let items = match self.items {
      Some(list) => Some(list.into_iter().map(|i| i.into_item(audit.id)).collect::<Result<Vec<_>, _>>()?),
      None => None,
    };
    Ok((audit, items))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditUpdate {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub zone_id: Option<Uuid>,
  #[serde(default, deserialize_with = "double_option")]
  pub auditor_id: Option<Option<Uuid>>,
  #[serde(default)]
  pub scheduled_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub status: Option<AuditStatus>,
  #[serde(default, deserialize_with = "double_option")]
  pub overall_score: Option<Option<u8>>,
  #[serde(default, deserialize_with = "double_option")]
  pub notes: Option<Option<String>>,
}

impl AuditUpdate {
  /// Aplica los cambios. La puntuación explícita se fija antes de la
  /// transición para que un "completar con nota" la respete.
  pub fn apply(self, audit: &mut Audit, items: &[ChecklistItem], now: DateTime<Utc>) -> Result<(), DomainError> {
    if let Some(Some(score)) = self.overall_score {
      validate_score(Some(score))?;
    }
    if let Some(title) = self.title {
      let title = title.trim().to_string();
      validate_title(&title)?;
      audit.title = title;
    }
    if let Some(zone) = self.zone_id {
      audit.zone_id = zone;
    }
    apply(&mut audit.auditor_id, self.auditor_id);
    if let Some(date) = self.scheduled_date {
      audit.scheduled_date = date;
    }
    apply(&mut audit.overall_score, self.overall_score);
    apply(&mut audit.notes, self.notes.map(clean));
    if let Some(status) = self.status {
      audit.transition(status, items, now)?;
    }
    Ok(())
  }
}
