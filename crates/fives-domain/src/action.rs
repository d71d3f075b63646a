// action.rs
use crate::patch::{apply, clean, double_option};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
  Low,
  Medium,
  High,
  Critical,
}

impl ActionPriority {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActionPriority::Low => "low",
      ActionPriority::Medium => "medium",
      ActionPriority::High => "high",
      ActionPriority::Critical => "critical",
    }
  }
}

impl FromStr for ActionPriority {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "low" => Ok(ActionPriority::Low),
      "medium" => Ok(ActionPriority::Medium),
      "high" => Ok(ActionPriority::High),
      "critical" => Ok(ActionPriority::Critical),
      other => Err(DomainError::validation(format!("prioridad desconocida: {}", other))),
    }
  }
}

/// Estado almacenado de una acción. "Vencida" no es un estado: se deriva
/// con [`Action::is_overdue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
  Open,
  InProgress,
  Closed,
}

impl ActionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActionStatus::Open => "open",
      ActionStatus::InProgress => "in_progress",
      ActionStatus::Closed => "closed",
    }
  }
}

impl fmt::Display for ActionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ActionStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "open" => Ok(ActionStatus::Open),
      "in_progress" => Ok(ActionStatus::InProgress),
      "closed" => Ok(ActionStatus::Closed),
      other => Err(DomainError::validation(format!("estado de acción desconocido: {}", other))),
    }
  }
}

/// Tarea correctiva, opcionalmente ligada a una auditoría / ítem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
  pub id: Uuid,
  pub title: String,
  pub description: Option<String>,
  pub audit_id: Option<Uuid>,
  pub checklist_item_id: Option<Uuid>,
  pub assignee_id: Option<Uuid>,
  pub zone_id: Option<Uuid>,
  pub priority: ActionPriority,
  pub status: ActionStatus,
  pub due_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub closed_at: Option<DateTime<Utc>>,
}

impl Action {
  /// `due_date < now` y no cerrada. Sin fecha límite nunca vence.
  pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
    self.status != ActionStatus::Closed && self.due_date.is_some_and(|d| d < now)
  }

  fn set_status(&mut self, status: ActionStatus, now: DateTime<Utc>) {
    if status == self.status {
      return;
    }
    self.closed_at = if status == ActionStatus::Closed { Some(now) } else { None };
    self.status = status;
  }
}

fn default_priority() -> ActionPriority {
  ActionPriority::Medium
}

fn validate_title(title: &str) -> Result<(), DomainError> {
  if title.is_empty() {
    return Err(DomainError::validation("el título de la acción no puede estar vacío"));
  }
  if title.chars().count() > 200 {
    return Err(DomainError::validation("el título de la acción supera 200 caracteres"));
  }
  Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAction {
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub audit_id: Option<Uuid>,
  #[serde(default)]
  pub checklist_item_id: Option<Uuid>,
  #[serde(default)]
  pub assignee_id: Option<Uuid>,
  #[serde(default)]
  pub zone_id: Option<Uuid>,
  #[serde(default = "default_priority")]
  pub priority: ActionPriority,
  #[serde(default)]
  pub due_date: Option<DateTime<Utc>>,
}

impl NewAction {
  pub fn into_action(self, now: DateTime<Utc>) -> Result<Action, DomainError> {
    let title = self.title.trim().to_string();
    validate_title(&title)?;
    if self.checklist_item_id.is_some() && self.audit_id.is_none() {
      return Err(DomainError::validation("checklistItemId requiere auditId"));
    }
    Ok(Action { id: Uuid::new_v4(),
                title,
                description: clean(self.description),
                audit_id: self.audit_id,
                checklist_item_id: self.checklist_item_id,
                assignee_id: self.assignee_id,
                zone_id: self.zone_id,
                priority: self.priority,
                status: ActionStatus::Open,
                due_date: self.due_date,
                created_at: now,
                closed_at: None })
  }
}

/// Cambio parcial de una acción; también es el cuerpo común del bulk
/// update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionUpdate {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub description: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub assignee_id: Option<Option<Uuid>>,
  #[serde(default, deserialize_with = "double_option")]
  pub zone_id: Option<Option<Uuid>>,
  #[serde(default)]
  pub priority: Option<ActionPriority>,
  #[serde(default)]
  pub status: Option<ActionStatus>,
  #[serde(default, deserialize_with = "double_option")]
  pub due_date: Option<Option<DateTime<Utc>>>,
}

impl ActionUpdate {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
    && self.description.is_none()
    && self.assignee_id.is_none()
    && self.zone_id.is_none()
    && self.priority.is_none()
    && self.status.is_none()
    && self.due_date.is_none()
  }

  /// Aplica sobre `action` sin consumir el update (el bulk lo reutiliza).
  pub fn apply(&self, action: &mut Action, now: DateTime<Utc>) -> Result<(), DomainError> {
    if let Some(title) = &self.title {
      let title = title.trim().to_string();
      validate_title(&title)?;
      action.title = title;
    }
    apply(&mut action.description, self.description.clone().map(clean));
    apply(&mut action.assignee_id, self.assignee_id);
    apply(&mut action.zone_id, self.zone_id);
    apply(&mut action.due_date, self.due_date);
    if let Some(p) = self.priority {
      action.priority = p;
    }
    if let Some(s) = self.status {
      action.set_status(s, now);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn action(status: ActionStatus, due: Option<DateTime<Utc>>) -> Action {
    let mut a = NewAction { title: "Retirar cajas".into(),
                            description: None,
                            audit_id: None,
                            checklist_item_id: None,
                            assignee_id: None,
                            zone_id: None,
                            priority: ActionPriority::High,
                            due_date: due }.into_action(Utc::now())
                                           .unwrap();
    a.status = status;
    a
  }

  #[test]
  fn overdue_is_derived_from_due_date_and_status() {
    let now = Utc::now();
    let yesterday = Some(now - Duration::days(1));
    assert!(action(ActionStatus::Open, yesterday).is_overdue(now));
    assert!(action(ActionStatus::InProgress, yesterday).is_overdue(now));
    assert!(!action(ActionStatus::Closed, yesterday).is_overdue(now));
    assert!(!action(ActionStatus::Open, None).is_overdue(now));
    assert!(!action(ActionStatus::Open, Some(now)).is_overdue(now));
  }

  #[test]
  fn overdue_is_not_an_accepted_status() {
    let res: Result<ActionUpdate, _> = serde_json::from_value(serde_json::json!({ "status": "overdue" }));
    assert!(res.is_err());
    let res: Result<ActionUpdate, _> = serde_json::from_value(serde_json::json!({ "status": "pending" }));
    assert!(res.is_err());
  }

  #[test]
  fn closing_stamps_closed_at_and_reopening_clears_it() {
    let now = Utc::now();
    let mut a = action(ActionStatus::Open, None);
    ActionUpdate { status: Some(ActionStatus::Closed), ..Default::default() }.apply(&mut a, now).unwrap();
    assert_eq!(a.closed_at, Some(now));
    ActionUpdate { status: Some(ActionStatus::Open), ..Default::default() }.apply(&mut a, now).unwrap();
    assert_eq!(a.closed_at, None);
  }

  #[test]
  fn item_link_requires_audit() {
    let res = NewAction { title: "x".into(),
                          description: None,
                          audit_id: None,
                          checklist_item_id: Some(Uuid::new_v4()),
                          assignee_id: None,
                          zone_id: None,
                          priority: ActionPriority::Low,
                          due_date: None }.into_action(Utc::now());
    assert!(res.is_err());
  }
}
