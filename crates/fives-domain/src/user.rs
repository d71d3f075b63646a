// user.rs
use crate::patch::{apply, clean, double_option};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MIN_API_KEY_LEN: usize = 16;
const THEMES: [&str; 3] = ["light", "dark", "system"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Admin,
  Supervisor,
  Auditor,
  User,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Supervisor => "supervisor",
      Role::Auditor => "auditor",
      Role::User => "user",
    }
  }

  pub fn is_admin(&self) -> bool {
    matches!(self, Role::Admin)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin" => Ok(Role::Admin),
      "supervisor" => Ok(Role::Supervisor),
      "auditor" => Ok(Role::Auditor),
      "user" => Ok(Role::User),
      other => Err(DomainError::validation(format!("rol desconocido: {}", other))),
    }
  }
}

/// Usuario de la aplicación. Nunca se borra físicamente: `is_active`
/// funciona como baja lógica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub display_name: Option<String>,
  pub email: Option<String>,
  pub role: Role,
  pub team_id: Option<Uuid>,
  pub zone_ids: Vec<Uuid>,
  pub language: String,
  pub theme: String,
  pub is_active: bool,
  /// sha256 hex de la API key; jamás sale en las respuestas.
  #[serde(skip_serializing, default)]
  pub api_key_hash: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Hash (sha256 hex) con el que se guarda y se busca una API key.
pub fn hash_api_key(api_key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(api_key.as_bytes());
  format!("{:x}", hasher.finalize())
}

fn validate_api_key(api_key: &str) -> Result<(), DomainError> {
  if api_key.len() < MIN_API_KEY_LEN {
    return Err(DomainError::validation(format!("la API key debe tener al menos {} caracteres", MIN_API_KEY_LEN)));
  }
  if api_key.chars().any(|c| c.is_whitespace()) {
    return Err(DomainError::validation("la API key no puede contener espacios"));
  }
  Ok(())
}

fn validate_username(username: &str) -> Result<(), DomainError> {
  let len = username.chars().count();
  if !(3..=64).contains(&len) {
    return Err(DomainError::validation("el nombre de usuario debe tener entre 3 y 64 caracteres"));
  }
  if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
    return Err(DomainError::validation("el nombre de usuario contiene caracteres inválidos"));
  }
  Ok(())
}

fn validate_email(email: &Option<String>) -> Result<(), DomainError> {
  match email {
    Some(e) if !e.contains('@') || e.starts_with('@') || e.ends_with('@') => {
      Err(DomainError::validation(format!("email inválido: {}", e)))
    }
    _ => Ok(()),
  }
}

fn validate_language(language: &str) -> Result<(), DomainError> {
  if language.is_empty() || language.len() > 10 || !language.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
    return Err(DomainError::validation(format!("idioma inválido: {}", language)));
  }
  Ok(())
}

fn validate_theme(theme: &str) -> Result<(), DomainError> {
  if !THEMES.contains(&theme) {
    return Err(DomainError::validation(format!("tema inválido: {} (light|dark|system)", theme)));
  }
  Ok(())
}

fn default_language() -> String {
  "en".into()
}

fn default_theme() -> String {
  "light".into()
}

fn default_role() -> Role {
  Role::User
}

/// Alta de usuario (sólo admin).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
  pub username: String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default = "default_role")]
  pub role: Role,
  #[serde(default)]
  pub team_id: Option<Uuid>,
  #[serde(default)]
  pub zone_ids: Vec<Uuid>,
  #[serde(default = "default_language")]
  pub language: String,
  #[serde(default = "default_theme")]
  pub theme: String,
  pub api_key: String,
}

impl NewUser {
  /// Valida el alta y construye el `User` (la key queda hasheada).
  pub fn into_user(self, now: DateTime<Utc>) -> Result<User, DomainError> {
    let username = self.username.trim().to_string();
    validate_username(&username)?;
    validate_api_key(&self.api_key)?;
    let email = clean(self.email);
    validate_email(&email)?;
    validate_language(&self.language)?;
    validate_theme(&self.theme)?;
    Ok(User { id: Uuid::new_v4(),
              username,
              display_name: clean(self.display_name),
              email,
              role: self.role,
              team_id: self.team_id,
              zone_ids: dedup(self.zone_ids),
              language: self.language,
              theme: self.theme,
              is_active: true,
              api_key_hash: hash_api_key(&self.api_key),
              created_at: now,
              updated_at: now })
  }
}

/// Cambios de admin sobre un usuario. Los campos ausentes no se tocan.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
  #[serde(default, deserialize_with = "double_option")]
  pub display_name: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub email: Option<Option<String>>,
  #[serde(default)]
  pub role: Option<Role>,
  #[serde(default, deserialize_with = "double_option")]
  pub team_id: Option<Option<Uuid>>,
  #[serde(default)]
  pub zone_ids: Option<Vec<Uuid>>,
  #[serde(default)]
  pub is_active: Option<bool>,
  #[serde(default)]
  pub api_key: Option<String>,
}

impl UserUpdate {
  pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> Result<(), DomainError> {
    if let Some(key) = &self.api_key {
      validate_api_key(key)?;
    }
    let email = self.email.map(clean);
    if let Some(e) = &email {
      validate_email(e)?;
    }
    apply(&mut user.display_name, self.display_name.map(clean));
    apply(&mut user.email, email);
    apply(&mut user.team_id, self.team_id);
    if let Some(role) = self.role {
      user.role = role;
    }
    if let Some(zones) = self.zone_ids {
      user.zone_ids = dedup(zones);
    }
    if let Some(active) = self.is_active {
      user.is_active = active;
    }
    if let Some(key) = self.api_key {
      user.api_key_hash = hash_api_key(&key);
    }
    user.updated_at = now;
    Ok(())
  }
}

/// Preferencias que cada usuario puede cambiar sobre sí mismo.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserSettings {
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub theme: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub display_name: Option<Option<String>>,
}

impl UserSettings {
  pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> Result<(), DomainError> {
    if let Some(lang) = &self.language {
      validate_language(lang)?;
    }
    if let Some(theme) = &self.theme {
      validate_theme(theme)?;
    }
    if let Some(lang) = self.language {
      user.language = lang;
    }
    if let Some(theme) = self.theme {
      user.theme = theme;
    }
    apply(&mut user.display_name, self.display_name.map(clean));
    user.updated_at = now;
    Ok(())
  }
}

/// Quita ids repetidos conservando el primer orden de aparición.
pub(crate) fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
  let mut seen = std::collections::HashSet::new();
  ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_user(username: &str, key: &str) -> NewUser {
    serde_json::from_value(serde_json::json!({ "username": username, "apiKey": key })).unwrap()
  }

  #[test]
  fn new_user_hashes_key_and_applies_defaults() {
    let user = new_user("ana.lopez", "0123456789abcdef").into_user(Utc::now()).unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.language, "en");
    assert!(user.is_active);
    assert_eq!(user.api_key_hash, hash_api_key("0123456789abcdef"));
    assert_ne!(user.api_key_hash, "0123456789abcdef");
  }

  #[test]
  fn api_key_hash_never_serialized() {
    let user = new_user("ana.lopez", "0123456789abcdef").into_user(Utc::now()).unwrap();
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("apiKeyHash").is_none());
    assert_eq!(json["role"], "user");
  }

  #[test]
  fn rejects_short_key_and_bad_username() {
    assert!(new_user("ana", "short").into_user(Utc::now()).is_err());
    assert!(new_user("a b", "0123456789abcdef").into_user(Utc::now()).is_err());
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let res: Result<NewUser, _> =
      serde_json::from_value(serde_json::json!({ "username": "ana", "apiKey": "0123456789abcdef", "isAdmin": true }));
    assert!(res.is_err());
  }

  #[test]
  fn update_can_clear_team() {
    let mut user = new_user("ana.lopez", "0123456789abcdef").into_user(Utc::now()).unwrap();
    user.team_id = Some(Uuid::new_v4());
    let patch: UserUpdate = serde_json::from_value(serde_json::json!({ "teamId": null })).unwrap();
    patch.apply(&mut user, Utc::now()).unwrap();
    assert_eq!(user.team_id, None);

    let untouched: UserUpdate = serde_json::from_value(serde_json::json!({ "role": "auditor" })).unwrap();
    let team = Uuid::new_v4();
    user.team_id = Some(team);
    untouched.apply(&mut user, Utc::now()).unwrap();
    assert_eq!(user.team_id, Some(team));
    assert_eq!(user.role, Role::Auditor);
  }

  #[test]
  fn settings_validate_theme() {
    let mut user = new_user("ana.lopez", "0123456789abcdef").into_user(Utc::now()).unwrap();
    let bad = UserSettings { theme: Some("neon".into()), ..Default::default() };
    assert!(bad.apply(&mut user, Utc::now()).is_err());
    let good = UserSettings { theme: Some("dark".into()), language: Some("es".into()), display_name: None };
    good.apply(&mut user, Utc::now()).unwrap();
    assert_eq!(user.theme, "dark");
    assert_eq!(user.language, "es");
  }
}
