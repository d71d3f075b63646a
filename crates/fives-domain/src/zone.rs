// zone.rs
use crate::patch::{apply, clean, double_option};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Área física sujeta a auditoría.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
  pub id: Uuid,
  pub name: String,
  pub zone_type: String,
  pub building: Option<String>,
  pub floor: Option<String>,
  pub description: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<(), DomainError> {
  if name.is_empty() {
    return Err(DomainError::validation("el nombre de la zona no puede estar vacío"));
  }
  if name.chars().count() > 120 {
    return Err(DomainError::validation("el nombre de la zona supera 120 caracteres"));
  }
  Ok(())
}

fn default_zone_type() -> String {
  "production".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewZone {
  pub name: String,
  #[serde(default = "default_zone_type")]
  pub zone_type: String,
  #[serde(default)]
  pub building: Option<String>,
  #[serde(default)]
  pub floor: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewZone {
  pub fn into_zone(self, now: DateTime<Utc>) -> Result<Zone, DomainError> {
    let name = self.name.trim().to_string();
    validate_name(&name)?;
    let zone_type = self.zone_type.trim().to_lowercase();
    if zone_type.is_empty() {
      return Err(DomainError::validation("el tipo de zona no puede estar vacío"));
    }
    Ok(Zone { id: Uuid::new_v4(),
              name,
              zone_type,
              building: clean(self.building),
              floor: clean(self.floor),
              description: clean(self.description),
              is_active: true,
              created_at: now })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ZoneUpdate {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub zone_type: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub building: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub floor: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub description: Option<Option<String>>,
  #[serde(default)]
  pub is_active: Option<bool>,
}

impl ZoneUpdate {
  pub fn apply(self, zone: &mut Zone) -> Result<(), DomainError> {
    if let Some(name) = self.name {
      let name = name.trim().to_string();
      validate_name(&name)?;
      zone.name = name;
    }
    if let Some(t) = self.zone_type {
      let t = t.trim().to_lowercase();
      if t.is_empty() {
        return Err(DomainError::validation("el tipo de zona no puede estar vacío"));
      }
      zone.zone_type = t;
    }
    apply(&mut zone.building, self.building.map(clean));
    apply(&mut zone.floor, self.floor.map(clean));
    apply(&mut zone.description, self.description.map(clean));
    if let Some(active) = self.is_active {
      zone.is_active = active;
    }
    Ok(())
  }
}
