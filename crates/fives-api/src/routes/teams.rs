// teams.rs
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use fives_domain::{ensure_user, ensure_zone, AuditRepository, NewTeam, Team, TeamUpdate};
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

fn ensure_team_refs(repo: &dyn AuditRepository, team: &Team) -> Result<(), ApiError> {
  for user in team.referenced_users() {
    ensure_user(repo, &user)?;
  }
  for zone in &team.zone_ids {
    ensure_zone(repo, zone)?;
  }
  Ok(())
}

async fn list(State(state): State<AppState>, _caller: CurrentUser) -> Result<Json<Vec<Team>>, ApiError> {
  Ok(Json(state.with_repo(|repo| Ok(repo.list_teams()?)).await?))
}

async fn create(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<NewTeam>)
                -> Result<(StatusCode, Json<Team>), ApiError> {
  caller.require_admin()?;
  let team = draft.into_team(state.now())?;
  let stored = team.clone();
  state.with_repo(move |repo| {
         ensure_team_refs(repo, &stored)?;
         Ok(repo.save_team(stored)?)
       })
       .await?;
  state.dashboard.directory_changed();
  Ok((StatusCode::CREATED, Json(team)))
}

async fn get_one(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<Team>, ApiError> {
  let team = state.with_repo(move |repo| Ok(repo.get_team(&id)?)).await?;
  team.map(Json).ok_or_else(|| ApiError::not_found("equipo", id))
}

async fn update(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                ApiJson(update): ApiJson<TeamUpdate>)
                -> Result<Json<Team>, ApiError> {
  caller.require_admin()?;
  let team = state.with_repo(move |repo| {
                    let mut team = repo.get_team(&id)?.ok_or_else(|| ApiError::not_found("equipo", id))?;
                    update.apply(&mut team)?;
                    ensure_team_refs(repo, &team)?;
                    repo.save_team(team.clone())?;
                    Ok(team)
                  })
                  .await?;
  Ok(Json(team))
}

async fn remove(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  if !state.with_repo(move |repo| Ok(repo.delete_team(&id)?)).await? {
    return Err(ApiError::not_found("equipo", id));
  }
  state.dashboard.directory_changed();
  Ok(StatusCode::NO_CONTENT)
}
