// report.rs
use crate::patch::clean;
use crate::record::{Drafted, Record, RecordKind};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadatos de un informe generado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
  pub id: Uuid,
  pub title: String,
  pub kind: String,
  pub zone_id: Option<Uuid>,
  pub period_start: DateTime<Utc>,
  pub period_end: DateTime<Utc>,
  pub summary: Option<String>,
  pub created_by: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

fn default_kind() -> String {
  "compliance".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportDraft {
  pub title: String,
  #[serde(default = "default_kind")]
  pub kind: String,
  #[serde(default)]
  pub zone_id: Option<Uuid>,
  pub period_start: DateTime<Utc>,
  pub period_end: DateTime<Utc>,
  #[serde(default)]
  pub summary: Option<String>,
}

impl Record for Report {
  const KIND: RecordKind = RecordKind::Report;

  fn id(&self) -> Uuid {
    self.id
  }

  fn referenced_zones(&self) -> Vec<Uuid> {
    self.zone_id.into_iter().collect()
  }
}

impl Drafted for Report {
  type Draft = ReportDraft;

  fn from_draft(draft: ReportDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let mut r = Report { id: Uuid::new_v4(),
                         title: String::new(),
                         kind: String::new(),
                         zone_id: None,
                         period_start: draft.period_start,
                         period_end: draft.period_end,
                         summary: None,
                         created_by: None,
                         created_at: now };
    r.apply_draft(draft, now)?;
    Ok(r)
  }

  fn apply_draft(&mut self, draft: ReportDraft, _now: DateTime<Utc>) -> Result<(), DomainError> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
      return Err(DomainError::validation("el título del informe no puede estar vacío"));
    }
    if draft.period_end < draft.period_start {
      return Err(DomainError::validation("periodEnd no puede ser anterior a periodStart"));
    }
    self.title = title;
    self.kind = draft.kind.trim().to_lowercase();
    self.zone_id = draft.zone_id;
    self.period_start = draft.period_start;
    self.period_end = draft.period_end;
    self.summary = clean(draft.summary);
    Ok(())
  }

  fn set_author(&mut self, user_id: Uuid) {
    self.created_by = Some(user_id);
  }
}
