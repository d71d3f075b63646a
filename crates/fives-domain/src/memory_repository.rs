// memory_repository.rs
use crate::record::RecordKind;
use crate::repository::AuditRepository;
use crate::{Action, Audit, ChecklistItem, DomainError, Team, User, Zone};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Implementación en memoria para tests y desarrollo. Conserva el orden de
/// inserción en los listados.
///
/// Cuando hace falta más de una tabla a la vez se bloquean siempre en el
/// mismo orden: zones, audits, items, actions.
#[derive(Clone, Default)]
pub struct InMemoryAuditRepository {
  users: Arc<Mutex<IndexMap<Uuid, User>>>,
  zones: Arc<Mutex<IndexMap<Uuid, Zone>>>,
  teams: Arc<Mutex<IndexMap<Uuid, Team>>>,
  audits: Arc<Mutex<IndexMap<Uuid, Audit>>>,
  items: Arc<Mutex<IndexMap<Uuid, ChecklistItem>>>,
  actions: Arc<Mutex<IndexMap<Uuid, Action>>>,
  records: Arc<Mutex<IndexMap<(RecordKind, Uuid), JsonValue>>>,
}

impl InMemoryAuditRepository {
  pub fn new() -> Self {
    Self::default()
  }

  // Mapea un mutex envenenado a StorageError
  fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, DomainError> {
    m.lock().map_err(|e| DomainError::StorageError(format!("Mutex '{}' poisoned: {}", name, e)))
  }
}

impl AuditRepository for InMemoryAuditRepository {
  fn save_user(&self, user: User) -> Result<Uuid, DomainError> {
    let mut users = self.lock_map(&self.users, "users")?;
    if users.values().any(|u| u.username == user.username && u.id != user.id) {
      return Err(DomainError::validation(format!("el nombre de usuario ya existe: {}", user.username)));
    }
    // La API key identifica al usuario: dos cuentas no pueden compartirla.
    if users.values().any(|u| u.api_key_hash == user.api_key_hash && u.id != user.id) {
      return Err(DomainError::validation("la API key ya está asignada a otro usuario"));
    }
    let id = user.id;
    users.insert(id, user);
    Ok(id)
  }

  fn get_user(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
    let users = self.lock_map(&self.users, "users")?;
    Ok(users.get(id).cloned())
  }

  fn find_user_by_api_key_hash(&self, hash: &str) -> Result<Option<User>, DomainError> {
    let users = self.lock_map(&self.users, "users")?;
    Ok(users.values().find(|u| u.api_key_hash == hash).cloned())
  }

  fn list_users(&self) -> Result<Vec<User>, DomainError> {
    let users = self.lock_map(&self.users, "users")?;
    Ok(users.values().cloned().collect())
  }

  fn save_zone(&self, zone: Zone) -> Result<Uuid, DomainError> {
    let id = zone.id;
    self.lock_map(&self.zones, "zones")?.insert(id, zone);
    Ok(id)
  }

  fn get_zone(&self, id: &Uuid) -> Result<Option<Zone>, DomainError> {
    Ok(self.lock_map(&self.zones, "zones")?.get(id).cloned())
  }

  fn list_zones(&self) -> Result<Vec<Zone>, DomainError> {
    Ok(self.lock_map(&self.zones, "zones")?.values().cloned().collect())
  }

  fn delete_zone(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut zones = self.lock_map(&self.zones, "zones")?;
    let audits = self.lock_map(&self.audits, "audits")?;
    let actions = self.lock_map(&self.actions, "actions")?;
    if audits.values().any(|a| &a.zone_id == id) || actions.values().any(|a| a.zone_id.as_ref() == Some(id)) {
      return Err(DomainError::validation(format!("la zona {} tiene auditorías o acciones asociadas", id)));
    }
    Ok(zones.shift_remove(id).is_some())
  }

  fn save_team(&self, team: Team) -> Result<Uuid, DomainError> {
    let id = team.id;
    self.lock_map(&self.teams, "teams")?.insert(id, team);
    Ok(id)
  }

  fn get_team(&self, id: &Uuid) -> Result<Option<Team>, DomainError> {
    Ok(self.lock_map(&self.teams, "teams")?.get(id).cloned())
  }

  fn list_teams(&self) -> Result<Vec<Team>, DomainError> {
    Ok(self.lock_map(&self.teams, "teams")?.values().cloned().collect())
  }

  fn delete_team(&self, id: &Uuid) -> Result<bool, DomainError> {
    Ok(self.lock_map(&self.teams, "teams")?.shift_remove(id).is_some())
  }

  fn create_audit_with_items(&self, audit: Audit, items: Vec<ChecklistItem>) -> Result<Uuid, DomainError> {
    if items.iter().any(|i| i.audit_id != audit.id) {
      return Err(DomainError::validation("todos los ítems deben pertenecer a la auditoría creada"));
    }
    let mut audits = self.lock_map(&self.audits, "audits")?;
    let mut stored = self.lock_map(&self.items, "items")?;
    if audits.contains_key(&audit.id) {
      return Err(DomainError::validation(format!("la auditoría {} ya existe", audit.id)));
    }
    let id = audit.id;
    audits.insert(id, audit);
    for item in items {
      stored.insert(item.id, item);
    }
    Ok(id)
  }

  fn update_audit(&self, audit: Audit) -> Result<(), DomainError> {
    let mut audits = self.lock_map(&self.audits, "audits")?;
    match audits.get_mut(&audit.id) {
      Some(slot) => {
        *slot = audit;
        Ok(())
      }
      None => Err(DomainError::not_found("auditoría", audit.id)),
    }
  }

  fn get_audit(&self, id: &Uuid) -> Result<Option<Audit>, DomainError> {
    Ok(self.lock_map(&self.audits, "audits")?.get(id).cloned())
  }

  fn list_audits(&self) -> Result<Vec<Audit>, DomainError> {
    Ok(self.lock_map(&self.audits, "audits")?.values().cloned().collect())
  }

  fn list_audits_for_zone(&self, zone_id: &Uuid) -> Result<Vec<Audit>, DomainError> {
    let audits = self.lock_map(&self.audits, "audits")?;
    Ok(audits.values().filter(|a| &a.zone_id == zone_id).cloned().collect())
  }

  fn delete_audit(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut audits = self.lock_map(&self.audits, "audits")?;
    let mut items = self.lock_map(&self.items, "items")?;
    let mut actions = self.lock_map(&self.actions, "actions")?;
    if audits.shift_remove(id).is_none() {
      return Ok(false);
    }
    items.retain(|_, i| &i.audit_id != id);
    for action in actions.values_mut().filter(|a| a.audit_id.as_ref() == Some(id)) {
      action.audit_id = None;
      action.checklist_item_id = None;
    }
    Ok(true)
  }

  fn list_checklist_items(&self, audit_id: &Uuid) -> Result<Vec<ChecklistItem>, DomainError> {
    let items = self.lock_map(&self.items, "items")?;
    Ok(items.values().filter(|i| &i.audit_id == audit_id).cloned().collect())
  }

  fn get_checklist_item(&self, id: &Uuid) -> Result<Option<ChecklistItem>, DomainError> {
    Ok(self.lock_map(&self.items, "items")?.get(id).cloned())
  }

  fn update_checklist_item(&self, item: ChecklistItem) -> Result<(), DomainError> {
    let mut items = self.lock_map(&self.items, "items")?;
    match items.get_mut(&item.id) {
      Some(slot) => {
        *slot = item;
        Ok(())
      }
      None => Err(DomainError::not_found("ítem de checklist", item.id)),
    }
  }

  fn save_action(&self, action: Action) -> Result<Uuid, DomainError> {
    let id = action.id;
    self.lock_map(&self.actions, "actions")?.insert(id, action);
    Ok(id)
  }

  fn get_action(&self, id: &Uuid) -> Result<Option<Action>, DomainError> {
    Ok(self.lock_map(&self.actions, "actions")?.get(id).cloned())
  }

  fn list_actions(&self) -> Result<Vec<Action>, DomainError> {
    Ok(self.lock_map(&self.actions, "actions")?.values().cloned().collect())
  }

  fn list_actions_for_assignee(&self, assignee_id: &Uuid) -> Result<Vec<Action>, DomainError> {
    let actions = self.lock_map(&self.actions, "actions")?;
    Ok(actions.values().filter(|a| a.assignee_id.as_ref() == Some(assignee_id)).cloned().collect())
  }

  fn delete_action(&self, id: &Uuid) -> Result<bool, DomainError> {
    Ok(self.lock_map(&self.actions, "actions")?.shift_remove(id).is_some())
  }

  fn save_record(&self, kind: RecordKind, id: Uuid, payload: JsonValue) -> Result<(), DomainError> {
    self.lock_map(&self.records, "records")?.insert((kind, id), payload);
    Ok(())
  }

  fn get_record(&self, kind: RecordKind, id: &Uuid) -> Result<Option<JsonValue>, DomainError> {
    Ok(self.lock_map(&self.records, "records")?.get(&(kind, *id)).cloned())
  }

  fn list_records(&self, kind: RecordKind) -> Result<Vec<JsonValue>, DomainError> {
    let records = self.lock_map(&self.records, "records")?;
    Ok(records.iter().filter(|((k, _), _)| *k == kind).map(|(_, v)| v.clone()).collect())
  }

  fn delete_record(&self, kind: RecordKind, id: &Uuid) -> Result<bool, DomainError> {
    Ok(self.lock_map(&self.records, "records")?.shift_remove(&(kind, *id)).is_some())
  }
}
