// question.rs
use crate::checklist::{NewChecklistItem, Pillar};
use crate::patch::clean;
use crate::record::{Drafted, Record, RecordKind};
use crate::user::dedup;
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plantilla de pregunta del checklist para una categoría 5S.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: Uuid,
  pub category: Pillar,
  pub text: String,
  pub description: Option<String>,
  /// Zonas donde está habilitada; vacío = todas.
  pub zone_ids: Vec<Uuid>,
  pub is_active: bool,
  pub sort_order: i32,
  pub created_at: DateTime<Utc>,
}

impl Question {
  pub fn applies_to_zone(&self, zone_id: Uuid) -> bool {
    self.is_active && (self.zone_ids.is_empty() || self.zone_ids.contains(&zone_id))
  }

  /// Ítem de checklist (sin responder) sembrado desde esta pregunta.
  pub fn to_checklist_item(&self) -> NewChecklistItem {
    NewChecklistItem { question_id: Some(self.id),
                       category: self.category,
                       question: self.text.clone(),
                       response: None,
                       note: None,
                       photo: None,
                       tags: Vec::new() }
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionDraft {
  pub category: Pillar,
  pub text: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub zone_ids: Vec<Uuid>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default)]
  pub sort_order: i32,
}

impl Record for Question {
  const KIND: RecordKind = RecordKind::Question;

  fn id(&self) -> Uuid {
    self.id
  }

  fn referenced_zones(&self) -> Vec<Uuid> {
    self.zone_ids.clone()
  }
}

impl Drafted for Question {
  type Draft = QuestionDraft;

  fn from_draft(draft: QuestionDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let mut q = Question { id: Uuid::new_v4(),
                           category: draft.category,
                           text: String::new(),
                           description: None,
                           zone_ids: Vec::new(),
                           is_active: true,
                           sort_order: 0,
                           created_at: now };
    q.apply_draft(draft, now)?;
    Ok(q)
  }

  fn apply_draft(&mut self, draft: QuestionDraft, _now: DateTime<Utc>) -> Result<(), DomainError> {
    let text = draft.text.trim().to_string();
    if text.is_empty() {
      return Err(DomainError::validation("el texto de la pregunta no puede estar vacío"));
    }
    self.category = draft.category;
    self.text = text;
    self.description = clean(draft.description);
    self.zone_ids = dedup(draft.zone_ids);
    self.is_active = draft.is_active;
    self.sort_order = draft.sort_order;
    Ok(())
  }
}

/// Checklist inicial para una auditoría de `zone_id`: preguntas activas
/// habilitadas en la zona, ordenadas por (categoría, sort_order).
pub fn seed_checklist(questions: &[Question], zone_id: Uuid) -> Vec<NewChecklistItem> {
  let mut selected: Vec<&Question> = questions.iter().filter(|q| q.applies_to_zone(zone_id)).collect();
  selected.sort_by_key(|q| (q.category, q.sort_order));
  selected.into_iter().map(Question::to_checklist_item).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn question(category: Pillar, order: i32, zones: Vec<Uuid>, active: bool) -> Question {
    Question::from_draft(QuestionDraft { category,
                                         text: format!("{:?} #{}", category, order),
                                         description: None,
                                         zone_ids: zones,
                                         is_active: active,
                                         sort_order: order },
                         Utc::now()).unwrap()
  }

  #[test]
  fn seed_filters_by_zone_and_orders_by_pillar() {
    let zone = Uuid::new_v4();
    let other = Uuid::new_v4();
    let qs = vec![question(Pillar::Sustain, 1, vec![], true),
                  question(Pillar::Sort, 2, vec![zone], true),
                  question(Pillar::Sort, 1, vec![], true),
                  question(Pillar::Shine, 1, vec![other], true),
                  question(Pillar::SetInOrder, 1, vec![], false)];
    let seeded = seed_checklist(&qs, zone);
    let cats: Vec<(Pillar, String)> = seeded.iter().map(|i| (i.category, i.question.clone())).collect();
    assert_eq!(cats,
               vec![(Pillar::Sort, "Sort #1".to_string()),
                    (Pillar::Sort, "Sort #2".to_string()),
                    (Pillar::Sustain, "Sustain #1".to_string())]);
    assert!(seeded.iter().all(|i| i.question_id.is_some()));
  }
}
