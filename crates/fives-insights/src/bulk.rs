// bulk.rs
use chrono::{DateTime, Utc};
use fives_domain::{ensure_action_refs, ActionUpdate, AuditRepository, DomainError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Cuerpo de `POST /api/actions/bulk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkActionUpdate {
  pub ids: Vec<Uuid>,
  pub update: ActionUpdate,
}

impl BulkActionUpdate {
  pub fn validate(&self) -> Result<(), DomainError> {
    if self.ids.is_empty() {
      return Err(DomainError::validation("ids no puede estar vacío"));
    }
    if self.update.is_empty() {
      return Err(DomainError::validation("update no contiene cambios"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
  pub id: Uuid,
  pub error: String,
}

/// Resultado de éxito parcial: lo aplicado no se revierte.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateOutcome {
  pub updated: usize,
  pub failed: Vec<BulkFailure>,
  /// Responsables (antes y después) de las acciones modificadas.
  #[serde(skip)]
  pub touched_assignees: Vec<Uuid>,
}

/// Aplica `update` a cada id en orden. Un id inexistente o un fallo
/// individual se anota en `failed` y se sigue con el resto.
pub fn bulk_update_actions(repo: &dyn AuditRepository, ids: &[Uuid], update: &ActionUpdate, now: DateTime<Utc>)
                           -> BulkUpdateOutcome {
  let mut outcome = BulkUpdateOutcome::default();
  for id in ids {
    match update_one(repo, id, update, now) {
      Ok(assignees) => {
        outcome.updated += 1;
        for a in assignees {
          if !outcome.touched_assignees.contains(&a) {
            outcome.touched_assignees.push(a);
          }
        }
      }
      Err(e) => {
        warn!(action_id = %id, error = %e, "bulk update: acción omitida");
        outcome.failed.push(BulkFailure { id: *id, error: e.to_string() });
      }
    }
  }
  debug!(updated = outcome.updated, failed = outcome.failed.len(), "bulk update terminado");
  outcome
}

fn update_one(repo: &dyn AuditRepository, id: &Uuid, update: &ActionUpdate, now: DateTime<Utc>)
              -> Result<Vec<Uuid>, DomainError> {
  let mut action = repo.get_action(id)?.ok_or_else(|| DomainError::not_found("acción", id))?;
  let before = action.assignee_id;
  update.apply(&mut action, now)?;
  ensure_action_refs(repo, &action)?;
  let after = action.assignee_id;
  repo.save_action(action)?;
  Ok(before.into_iter().chain(after).collect())
}
