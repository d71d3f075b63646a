// zones.rs
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use fives_domain::{NewZone, Zone, ZoneUpdate};
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath},
  state::AppState,
};

pub fn router() -> Router<AppState> {
  Router::new().route("/", get(list).post(create))
               .route("/:id", get(get_one).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _caller: CurrentUser) -> Result<Json<Vec<Zone>>, ApiError> {
  Ok(Json(state.with_repo(|repo| Ok(repo.list_zones()?)).await?))
}

async fn create(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<NewZone>)
                -> Result<(StatusCode, Json<Zone>), ApiError> {
  caller.require_admin()?;
  let zone = draft.into_zone(state.now())?;
  let stored = zone.clone();
  state.with_repo(move |repo| Ok(repo.save_zone(stored)?)).await?;
  Ok((StatusCode::CREATED, Json(zone)))
}

async fn get_one(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<Zone>, ApiError> {
  let zone = state.with_repo(move |repo| Ok(repo.get_zone(&id)?)).await?;
  zone.map(Json).ok_or_else(|| ApiError::not_found("zona", id))
}

async fn update(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                ApiJson(update): ApiJson<ZoneUpdate>)
                -> Result<Json<Zone>, ApiError> {
  caller.require_admin()?;
  let zone = state.with_repo(move |repo| {
                    let mut zone = repo.get_zone(&id)?.ok_or_else(|| ApiError::not_found("zona", id))?;
                    update.apply(&mut zone)?;
                    repo.save_zone(zone.clone())?;
                    Ok(zone)
                  })
                  .await?;
  state.dashboard.audits_changed(&[id]);
  Ok(Json(zone))
}

/// Rechazado (400) mientras la zona esté referenciada.
async fn remove(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  if !state.with_repo(move |repo| Ok(repo.delete_zone(&id)?)).await? {
    return Err(ApiError::not_found("zona", id));
  }
  state.dashboard.audits_changed(&[id]);
  Ok(StatusCode::NO_CONTENT)
}
