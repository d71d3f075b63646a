// auth.rs
use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{header::AUTHORIZATION, request::Parts},
};
use fives_domain::{hash_api_key, Role, User};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Usuario autenticado por `Authorization: Bearer <api key>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
  pub fn id(&self) -> Uuid {
    self.0.id
  }

  pub fn role(&self) -> Role {
    self.0.role
  }

  pub fn is_admin(&self) -> bool {
    self.0.role.is_admin()
  }

  /// 403 salvo que el rol esté en `roles`.
  pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&self.0.role) {
      Ok(())
    } else {
      Err(ApiError::forbidden(format!("el rol {} no puede realizar esta operación", self.0.role)))
    }
  }

  pub fn require_admin(&self) -> Result<(), ApiError> {
    self.require(&[Role::Admin])
  }
}

fn bearer_key(parts: &Parts) -> Result<&str, ApiError> {
  let header = parts.headers
                    .get(AUTHORIZATION)
                    .ok_or_else(|| ApiError::Unauthorized("falta la cabecera Authorization".into()))?;
  let value = header.to_str()
                    .map_err(|_| ApiError::Unauthorized("cabecera Authorization inválida".into()))?;
  value.strip_prefix("Bearer ")
       .map(str::trim)
       .filter(|k| !k.is_empty())
       .ok_or_else(|| ApiError::Unauthorized("se esperaba 'Bearer <api key>'".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    let hash = hash_api_key(bearer_key(parts)?);
    let user = state.with_repo(move |repo| Ok(repo.find_user_by_api_key_hash(&hash)?))
                    .await?
                    .ok_or_else(|| ApiError::Unauthorized("API key desconocida".into()))?;
    if !user.is_active {
      return Err(ApiError::forbidden("usuario desactivado"));
    }
    Ok(CurrentUser(user))
  }
}
