// rules.rs
use crate::notifications::{Notification, NotificationPriority, NotificationType};
use chrono::{DateTime, Utc};
use fives_domain::{Action, Audit, AuditStatus, NotificationRule, RuleTrigger, User};
use serde::Serialize;
use uuid::Uuid;

/// Resultado de probar una regla contra el estado actual.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestOutcome {
  pub rule_id: Uuid,
  pub trigger: RuleTrigger,
  pub is_active: bool,
  pub matched: usize,
  pub entity_ids: Vec<Uuid>,
  /// Usuarios activos con el rol destino.
  pub recipients: Vec<Uuid>,
  pub preview: Vec<Notification>,
}

/// Evalúa la regla una vez (no hay planificador). Las reglas inactivas se
/// evalúan igual para poder probarlas antes de activarlas.
pub fn evaluate_rule(rule: &NotificationRule, audits: &[Audit], actions: &[Action], users: &[User], now: DateTime<Utc>)
                     -> RuleTestOutcome {
  let preview: Vec<(Uuid, Notification)> = match rule.trigger {
    RuleTrigger::ActionOverdue => actions.iter()
                                         .filter(|a| a.is_overdue(now))
                                         .map(|a| {
                                           (a.id,
                                            Notification::new(format!("rule-{}-{}", rule.id, a.id),
                                                              NotificationType::ActionOverdue,
                                                              NotificationPriority::High,
                                                              rule.name.clone(),
                                                              format!("La acción \"{}\" está vencida", a.title),
                                                              now))
                                         })
                                         .collect(),
    RuleTrigger::AuditDueToday => audits.iter()
                                        .filter(|a| a.status == AuditStatus::Scheduled && a.is_scheduled_on_day_of(now))
                                        .map(|a| {
                                          (a.id,
                                           Notification::new(format!("rule-{}-{}", rule.id, a.id),
                                                             NotificationType::AuditAssigned,
                                                             NotificationPriority::Medium,
                                                             rule.name.clone(),
                                                             format!("La auditoría \"{}\" está programada para hoy",
                                                                     a.title),
                                                             now))
                                        })
                                        .collect(),
    RuleTrigger::LowScore => {
      let threshold = rule.effective_threshold();
      audits.iter()
            .filter(|a| a.is_completed())
            .filter_map(|a| a.overall_score.filter(|s| *s < threshold).map(|s| (a, s)))
            .map(|(a, score)| {
              (a.id,
               Notification::new(format!("rule-{}-{}", rule.id, a.id),
                                 NotificationType::LowScore,
                                 NotificationPriority::High,
                                 rule.name.clone(),
                                 format!("La auditoría \"{}\" obtuvo {} (< {})", a.title, score, threshold),
                                 now))
            })
            .collect()
    }
  };
  let recipients = users.iter().filter(|u| u.is_active && u.role == rule.target_role).map(|u| u.id).collect();
  let (entity_ids, preview): (Vec<Uuid>, Vec<Notification>) = preview.into_iter().unzip();
  RuleTestOutcome { rule_id: rule.id,
                    trigger: rule.trigger,
                    is_active: rule.is_active,
                    matched: entity_ids.len(),
                    entity_ids,
                    recipients,
                    preview }
}
