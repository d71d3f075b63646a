// users.rs
use axum::{
  extract::State,
  http::StatusCode,
  routing::{get, put},
  Json, Router,
};
use fives_domain::{ensure_team, ensure_zone, NewUser, User, UserSettings, UserUpdate};
use tracing::info;
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath},
  state::AppState,
};

pub fn router() -> Router<AppState> {
  Router::new().route("/", get(list).post(create))
               .route("/me", get(me))
               .route("/me/settings", put(update_settings))
               .route("/:id", get(get_one).put(update).delete(deactivate))
}

async fn list(State(state): State<AppState>, _caller: CurrentUser) -> Result<Json<Vec<User>>, ApiError> {
  Ok(Json(state.with_repo(|repo| Ok(repo.list_users()?)).await?))
}

async fn me(caller: CurrentUser) -> Json<User> {
  Json(caller.0)
}

async fn update_settings(State(state): State<AppState>, caller: CurrentUser,
                         ApiJson(settings): ApiJson<UserSettings>)
                         -> Result<Json<User>, ApiError> {
  let now = state.now();
  let mut user = caller.0;
  settings.apply(&mut user, now)?;
  let saved = user.clone();
  state.with_repo(move |repo| Ok(repo.save_user(saved)?)).await?;
  Ok(Json(user))
}

async fn create(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<NewUser>)
                -> Result<(StatusCode, Json<User>), ApiError> {
  caller.require_admin()?;
  let user = draft.into_user(state.now())?;
  let stored = user.clone();
  state.with_repo(move |repo| {
         if let Some(team) = stored.team_id {
           ensure_team(repo, &team)?;
         }
         for zone in &stored.zone_ids {
           ensure_zone(repo, zone)?;
         }
         Ok(repo.save_user(stored)?)
       })
       .await?;
  state.dashboard.directory_changed();
  info!(user_id = %user.id, username = %user.username, "usuario creado");
  Ok((StatusCode::CREATED, Json(user)))
}

async fn get_one(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<User>, ApiError> {
  let user = state.with_repo(move |repo| Ok(repo.get_user(&id)?)).await?;
  user.map(Json).ok_or_else(|| ApiError::not_found("usuario", id))
}

async fn update(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                ApiJson(update): ApiJson<UserUpdate>)
                -> Result<Json<User>, ApiError> {
  caller.require_admin()?;
  if update.is_active == Some(false) {
    refuse_self_deactivation(&caller, id)?;
  }
  let now = state.now();
  let user = state.with_repo(move |repo| {
                    let mut user = repo.get_user(&id)?.ok_or_else(|| ApiError::not_found("usuario", id))?;
                    update.apply(&mut user, now)?;
                    if let Some(team) = user.team_id {
                      ensure_team(repo, &team)?;
                    }
                    for zone in &user.zone_ids {
                      ensure_zone(repo, zone)?;
                    }
                    repo.save_user(user.clone())?;
                    Ok(user)
                  })
                  .await?;
  state.dashboard.directory_changed();
  Ok(Json(user))
}

fn refuse_self_deactivation(caller: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
  if caller.id() == id {
    return Err(ApiError::BadRequest("un administrador no puede desactivarse a sí mismo".into()));
  }
  Ok(())
}

/// Los usuarios no se borran: quedan referenciados por auditorías y
/// acciones. `DELETE` los desactiva.
async fn deactivate(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                    -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  refuse_self_deactivation(&caller, id)?;
  let now = state.now();
  state.with_repo(move |repo| {
         let mut user = repo.get_user(&id)?.ok_or_else(|| ApiError::not_found("usuario", id))?;
         UserUpdate { is_active: Some(false), ..Default::default() }.apply(&mut user, now)?;
         repo.save_user(user)?;
         Ok(())
       })
       .await?;
  state.dashboard.directory_changed();
  info!(user_id = %id, "usuario desactivado");
  Ok(StatusCode::NO_CONTENT)
}
