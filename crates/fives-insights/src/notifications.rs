// notifications.rs
use chrono::{DateTime, Utc};
use fives_domain::{AuditRepository, AuditStatus, DomainError, Role};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
  ActionOverdue,
  AuditAssigned,
  LowScore,
  SystemUpdate,
  Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
  Low,
  Medium,
  High,
}

/// Notificación efímera: se recalcula en cada petición y no se guarda.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: NotificationType,
  pub title: String,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  pub is_read: bool,
  pub priority: NotificationPriority,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub action_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub action_text: Option<String>,
}

impl Notification {
  pub(crate) fn new(id: String, kind: NotificationType, priority: NotificationPriority, title: String, message: String,
                    timestamp: DateTime<Utc>)
                    -> Self {
    Notification { id,
                   kind,
                   title,
                   message,
                   timestamp,
                   is_read: false,
                   priority,
                   action_url: None,
                   action_text: None }
  }

  pub(crate) fn with_link(mut self, url: String, text: &str) -> Self {
    self.action_url = Some(url);
    self.action_text = Some(text.to_string());
    self
  }
}

/// Notificaciones del usuario en orden de generación: acciones vencidas,
/// auditorías de hoy, aviso de sistema (admins) y, si no hubo nada, la
/// bienvenida.
///
/// Nunca falla: un error del almacenamiento se registra y se devuelve una
/// lista vacía.
pub fn generate(repo: &dyn AuditRepository, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Vec<Notification> {
  match try_generate(repo, user_id, role, now) {
    Ok(list) => list,
    Err(e) => {
      warn!(%user_id, error = %e, "no se pudieron generar notificaciones");
      Vec::new()
    }
  }
}

fn try_generate(repo: &dyn AuditRepository, user_id: Uuid, role: Role, now: DateTime<Utc>)
                -> Result<Vec<Notification>, DomainError> {
  let mut out = Vec::new();

  for action in repo.list_actions_for_assignee(&user_id)?.into_iter().filter(|a| a.is_overdue(now)) {
    let due = action.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    out.push(Notification::new(format!("overdue-{}", action.id),
                               NotificationType::ActionOverdue,
                               NotificationPriority::High,
                               "Acción vencida".into(),
                               format!("\"{}\" venció el {}", action.title, due),
                               now).with_link(format!("/actions/{}", action.id), "Ver acción"));
  }

  let todays = repo.list_audits()?
                   .into_iter()
                   .filter(|a| a.auditor_id == Some(user_id) && a.status == AuditStatus::Scheduled && a.is_scheduled_on_day_of(now));
  for audit in todays {
    out.push(Notification::new(format!("audit-{}", audit.id),
                               NotificationType::AuditAssigned,
                               NotificationPriority::Medium,
                               "Auditoría programada para hoy".into(),
                               format!("\"{}\" a las {}", audit.title, audit.scheduled_date.format("%H:%M")),
                               now).with_link(format!("/audits/{}", audit.id), "Empezar auditoría"));
  }

  if role.is_admin() {
    out.push(Notification::new("system-update".into(),
                               NotificationType::SystemUpdate,
                               NotificationPriority::Low,
                               "Estado del sistema".into(),
                               "Revisa la configuración de reglas de notificación y programaciones.".into(),
                               now).with_link("/settings".into(), "Abrir ajustes"));
  }

  if out.is_empty() {
    out.push(Notification::new("welcome".into(),
                               NotificationType::Welcome,
                               NotificationPriority::Low,
                               "Bienvenido".into(),
                               "No tienes tareas pendientes por ahora.".into(),
                               now));
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};
  use fives_domain::{ActionPriority, ActionStatus, InMemoryAuditRepository, NewAction, NewAudit};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
  }

  fn assigned_action(repo: &InMemoryAuditRepository, user: Uuid, status: ActionStatus, due: DateTime<Utc>) {
    let mut a = NewAction { title: "Ordenar herramientas".into(),
                            description: None,
                            audit_id: None,
                            checklist_item_id: None,
                            assignee_id: Some(user),
                            zone_id: None,
                            priority: ActionPriority::High,
                            due_date: Some(due) }.into_action(now())
                                                 .unwrap();
    a.status = status;
    repo.save_action(a).unwrap();
  }

  #[test]
  fn plain_user_without_work_gets_exactly_one_welcome() {
    let repo = InMemoryAuditRepository::new();
    let list = generate(&repo, Uuid::new_v4(), Role::User, now());
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, NotificationType::Welcome);
    assert!(!list[0].is_read);
  }

  #[test]
  fn admin_gets_system_update_instead_of_welcome() {
    let repo = InMemoryAuditRepository::new();
    let list = generate(&repo, Uuid::new_v4(), Role::Admin, now());
    assert_eq!(list.iter().map(|n| n.kind).collect::<Vec<_>>(), vec![NotificationType::SystemUpdate]);
  }

  #[test]
  fn order_is_overdue_then_todays_audits_then_system() {
    let repo = InMemoryAuditRepository::new();
    let user = Uuid::new_v4();
    assigned_action(&repo, user, ActionStatus::Open, now() - Duration::days(1));
    assigned_action(&repo, user, ActionStatus::Closed, now() - Duration::days(1));
    assigned_action(&repo, user, ActionStatus::Open, now() + Duration::days(1));
    let (audit, _) = NewAudit { title: "Ronda de mañana".into(),
                                zone_id: Uuid::new_v4(),
                                auditor_id: Some(user),
                                scheduled_date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
                                notes: None,
                                items: None }.into_audit(now())
                                             .unwrap();
    repo.create_audit_with_items(audit, vec![]).unwrap();

    let list = generate(&repo, user, Role::Admin, now());
    let kinds: Vec<NotificationType> = list.iter().map(|n| n.kind).collect();
    assert_eq!(kinds,
               vec![NotificationType::ActionOverdue, NotificationType::AuditAssigned, NotificationType::SystemUpdate]);
    assert_eq!(list[0].priority, NotificationPriority::High);
    assert_eq!(list[1].priority, NotificationPriority::Medium);
  }

  #[test]
  fn serialized_shape_uses_type_and_camel_case() {
    let repo = InMemoryAuditRepository::new();
    let json = serde_json::to_value(generate(&repo, Uuid::new_v4(), Role::User, now())).unwrap();
    assert_eq!(json[0]["type"], "welcome");
    assert_eq!(json[0]["isRead"], false);
    assert!(json[0].get("actionUrl").is_none());
  }
}
