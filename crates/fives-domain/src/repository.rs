// repository.rs
use crate::record::{Record, RecordKind};
use crate::{Action, Audit, ChecklistItem, DomainError, Team, User, Zone};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Operaciones de persistencia del dominio de auditorías.
///
/// Los `save_*` son upsert (insertan o reemplazan por id). Los `delete_*`
/// devuelven `true` si la entidad existía.
pub trait AuditRepository: Send + Sync {
  /// Guarda un usuario. El `username` debe ser único.
  fn save_user(&self, user: User) -> Result<Uuid, DomainError>;
  fn get_user(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
  /// Busca por el hash sha256 de la API key.
  fn find_user_by_api_key_hash(&self, hash: &str) -> Result<Option<User>, DomainError>;
  fn list_users(&self) -> Result<Vec<User>, DomainError>;

  fn save_zone(&self, zone: Zone) -> Result<Uuid, DomainError>;
  fn get_zone(&self, id: &Uuid) -> Result<Option<Zone>, DomainError>;
  fn list_zones(&self) -> Result<Vec<Zone>, DomainError>;
  /// Falla con `ValidationError` si alguna auditoría o acción la referencia.
  fn delete_zone(&self, id: &Uuid) -> Result<bool, DomainError>;

  fn save_team(&self, team: Team) -> Result<Uuid, DomainError>;
  fn get_team(&self, id: &Uuid) -> Result<Option<Team>, DomainError>;
  fn list_teams(&self) -> Result<Vec<Team>, DomainError>;
  fn delete_team(&self, id: &Uuid) -> Result<bool, DomainError>;

  /// Inserta la auditoría y su checklist de forma atómica: o se guardan
  /// todos o ninguno.
  fn create_audit_with_items(&self, audit: Audit, items: Vec<ChecklistItem>) -> Result<Uuid, DomainError>;
  /// Reemplaza una auditoría existente (`NotFound` si no existe).
  fn update_audit(&self, audit: Audit) -> Result<(), DomainError>;
  fn get_audit(&self, id: &Uuid) -> Result<Option<Audit>, DomainError>;
  fn list_audits(&self) -> Result<Vec<Audit>, DomainError>;
  fn list_audits_for_zone(&self, zone_id: &Uuid) -> Result<Vec<Audit>, DomainError>;
  /// Borra la auditoría con sus ítems; las acciones que la referencian
  /// quedan desvinculadas.
  fn delete_audit(&self, id: &Uuid) -> Result<bool, DomainError>;

  fn list_checklist_items(&self, audit_id: &Uuid) -> Result<Vec<ChecklistItem>, DomainError>;
  fn get_checklist_item(&self, id: &Uuid) -> Result<Option<ChecklistItem>, DomainError>;
  /// Reemplaza un ítem existente (`NotFound` si no existe).
  fn update_checklist_item(&self, item: ChecklistItem) -> Result<(), DomainError>;

  fn save_action(&self, action: Action) -> Result<Uuid, DomainError>;
  fn get_action(&self, id: &Uuid) -> Result<Option<Action>, DomainError>;
  fn list_actions(&self) -> Result<Vec<Action>, DomainError>;
  fn list_actions_for_assignee(&self, assignee_id: &Uuid) -> Result<Vec<Action>, DomainError>;
  fn delete_action(&self, id: &Uuid) -> Result<bool, DomainError>;

  /// Guarda el documento JSON de un registro auxiliar.
  fn save_record(&self, kind: RecordKind, id: Uuid, payload: JsonValue) -> Result<(), DomainError>;
  fn get_record(&self, kind: RecordKind, id: &Uuid) -> Result<Option<JsonValue>, DomainError>;
  /// Registros de un tipo en orden de alta.
  fn list_records(&self, kind: RecordKind) -> Result<Vec<JsonValue>, DomainError>;
  fn delete_record(&self, kind: RecordKind, id: &Uuid) -> Result<bool, DomainError>;
}

/// Acceso tipado a los registros auxiliares sobre cualquier repositorio.
pub trait RecordStore {
  fn put_record<T: Record>(&self, record: &T) -> Result<Uuid, DomainError>;
  fn fetch_record<T: Record>(&self, id: &Uuid) -> Result<Option<T>, DomainError>;
  fn fetch_records<T: Record>(&self) -> Result<Vec<T>, DomainError>;
  fn remove_record<T: Record>(&self, id: &Uuid) -> Result<bool, DomainError>;
}

impl<R: AuditRepository + ?Sized> RecordStore for R {
  fn put_record<T: Record>(&self, record: &T) -> Result<Uuid, DomainError> {
    let id = record.id();
    self.save_record(T::KIND, id, serde_json::to_value(record)?)?;
    Ok(id)
  }

  fn fetch_record<T: Record>(&self, id: &Uuid) -> Result<Option<T>, DomainError> {
    match self.get_record(T::KIND, id)? {
      Some(v) => Ok(Some(serde_json::from_value(v)?)),
      None => Ok(None),
    }
  }

  fn fetch_records<T: Record>(&self) -> Result<Vec<T>, DomainError> {
    self.list_records(T::KIND)?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(DomainError::from))
        .collect()
  }

  fn remove_record<T: Record>(&self, id: &Uuid) -> Result<bool, DomainError> {
    self.delete_record(T::KIND, id)
  }
}

// Comprobaciones de referencias por id antes de escribir.

pub fn ensure_user(repo: &dyn AuditRepository, id: &Uuid) -> Result<(), DomainError> {
  match repo.get_user(id)? {
    Some(_) => Ok(()),
    None => Err(DomainError::validation(format!("usuario referenciado no existe: {}", id))),
  }
}

pub fn ensure_zone(repo: &dyn AuditRepository, id: &Uuid) -> Result<(), DomainError> {
  match repo.get_zone(id)? {
    Some(_) => Ok(()),
    None => Err(DomainError::validation(format!("zona referenciada no existe: {}", id))),
  }
}

pub fn ensure_team(repo: &dyn AuditRepository, id: &Uuid) -> Result<(), DomainError> {
  match repo.get_team(id)? {
    Some(_) => Ok(()),
    None => Err(DomainError::validation(format!("equipo referenciado no existe: {}", id))),
  }
}

/// Verifica zonas y equipos que declara un registro auxiliar.
pub fn ensure_record_refs<T: Record>(repo: &dyn AuditRepository, record: &T) -> Result<(), DomainError> {
  for zone in record.referenced_zones() {
    ensure_zone(repo, &zone)?;
  }
  for team in record.referenced_teams() {
    ensure_team(repo, &team)?;
  }
  Ok(())
}

/// Verifica las referencias de una acción, incluido que el ítem de
/// checklist pertenezca a la auditoría indicada.
pub fn ensure_action_refs(repo: &dyn AuditRepository, action: &Action) -> Result<(), DomainError> {
  if let Some(assignee) = action.assignee_id {
    ensure_user(repo, &assignee)?;
  }
  if let Some(zone) = action.zone_id {
    ensure_zone(repo, &zone)?;
  }
  if let Some(audit_id) = action.audit_id {
    if repo.get_audit(&audit_id)?.is_none() {
      return Err(DomainError::validation(format!("auditoría referenciada no existe: {}", audit_id)));
    }
    if let Some(item_id) = action.checklist_item_id {
      match repo.get_checklist_item(&item_id)? {
        Some(item) if item.audit_id == audit_id => {}
        _ => return Err(DomainError::validation(format!("el ítem {} no pertenece a la auditoría {}", item_id, audit_id))),
      }
    }
  }
  Ok(())
}
