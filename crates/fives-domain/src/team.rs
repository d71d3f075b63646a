// team.rs
use crate::patch::{apply, clean, double_option};
use crate::user::dedup;
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Equipo: líder, miembros y zonas asignadas se referencian por id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub leader_id: Option<Uuid>,
  pub member_ids: Vec<Uuid>,
  pub zone_ids: Vec<Uuid>,
  pub responsibilities: Vec<String>,
  pub created_at: DateTime<Utc>,
}

impl Team {
  /// Todos los usuarios referenciados (líder incluido, sin repetir).
  pub fn referenced_users(&self) -> Vec<Uuid> {
    let mut ids = self.member_ids.clone();
    if let Some(leader) = self.leader_id {
      ids.push(leader);
    }
    dedup(ids)
  }

  fn normalize(&mut self) -> Result<(), DomainError> {
    self.name = self.name.trim().to_string();
    if self.name.is_empty() {
      return Err(DomainError::validation("el nombre del equipo no puede estar vacío"));
    }
    self.member_ids = dedup(std::mem::take(&mut self.member_ids));
    self.zone_ids = dedup(std::mem::take(&mut self.zone_ids));
    self.responsibilities = std::mem::take(&mut self.responsibilities).into_iter()
                                                                       .map(|r| r.trim().to_string())
                                                                       .filter(|r| !r.is_empty())
                                                                       .collect();
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTeam {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub leader_id: Option<Uuid>,
  #[serde(default)]
  pub member_ids: Vec<Uuid>,
  #[serde(default)]
  pub zone_ids: Vec<Uuid>,
  #[serde(default)]
  pub responsibilities: Vec<String>,
}

impl NewTeam {
  /// Construye el equipo. La existencia de usuarios y zonas referenciados
  /// la comprueba el llamador contra el repositorio.
  pub fn into_team(self, now: DateTime<Utc>) -> Result<Team, DomainError> {
    let mut team = Team { id: Uuid::new_v4(),
                          name: self.name,
                          description: clean(self.description),
                          leader_id: self.leader_id,
                          member_ids: self.member_ids,
                          zone_ids: self.zone_ids,
                          responsibilities: self.responsibilities,
                          created_at: now };
    team.normalize()?;
    Ok(team)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeamUpdate {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub description: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub leader_id: Option<Option<Uuid>>,
  #[serde(default)]
  pub member_ids: Option<Vec<Uuid>>,
  #[serde(default)]
  pub zone_ids: Option<Vec<Uuid>>,
  #[serde(default)]
  pub responsibilities: Option<Vec<String>>,
}

impl TeamUpdate {
  pub fn apply(self, team: &mut Team) -> Result<(), DomainError> {
    if let Some(name) = self.name {
      team.name = name;
    }
    apply(&mut team.description, self.description.map(clean));
    apply(&mut team.leader_id, self.leader_id);
    if let Some(members) = self.member_ids {
      team.member_ids = members;
    }
    if let Some(zones) = self.zone_ids {
      team.zone_ids = zones;
    }
    if let Some(resp) = self.responsibilities {
      team.responsibilities = resp;
    }
    team.normalize()
  }
}
