// actions.rs
use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  routing::{get, post},
  Json, Router,
};
use chrono::{DateTime, Utc};
use fives_domain::{ensure_action_refs, Action, ActionUpdate, AuditRepository, NewAction, Role};
use fives_insights::{bulk_update_actions, BulkActionUpdate, BulkUpdateOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath, ApiQuery},
  state::{blocking, AppState},
};

pub fn router() -> Router<AppState> {
  Router::new().route("/", get(list).post(create))
               .route("/bulk", post(bulk_update))
               .route("/:id", get(get_one).put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionFilter {
  assignee_id: Option<Uuid>,
  #[serde(default)]
  overdue: bool,
}

/// Acción tal como sale por la API: con `isOverdue` derivado.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
  #[serde(flatten)]
  action: Action,
  is_overdue: bool,
}

impl ActionView {
  fn new(action: Action, now: DateTime<Utc>) -> Self {
    let is_overdue = action.is_overdue(now);
    Self { action, is_overdue }
  }
}

fn load_action(repo: &dyn AuditRepository, id: Uuid) -> Result<Action, ApiError> {
  repo.get_action(&id)?.ok_or_else(|| ApiError::not_found("acción", id))
}

async fn list(State(state): State<AppState>, _caller: CurrentUser, ApiQuery(filter): ApiQuery<ActionFilter>)
              -> Result<Json<Vec<ActionView>>, ApiError> {
  let now = state.now();
  let mut actions = match filter.assignee_id {
    Some(assignee) => {
      let dashboard = state.dashboard.clone();
      Arc::unwrap_or_clone(blocking(move || Ok(dashboard.actions_for_assignee(&assignee)?)).await?)
    }
    None => state.with_repo(|repo| Ok(repo.list_actions()?)).await?,
  };
  if filter.overdue {
    actions.retain(|a| a.is_overdue(now));
  }
  Ok(Json(actions.into_iter().map(|a| ActionView::new(a, now)).collect()))
}

async fn create(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<NewAction>)
                -> Result<(StatusCode, Json<ActionView>), ApiError> {
  caller.require(&[Role::Admin, Role::Supervisor, Role::Auditor])?;
  let now = state.now();
  let action = draft.into_action(now)?;
  let stored = action.clone();
  state.with_repo(move |repo| {
         ensure_action_refs(repo, &stored)?;
         Ok(repo.save_action(stored)?)
       })
       .await?;
  state.dashboard.actions_changed(&action.assignee_id.into_iter().collect::<Vec<_>>());
  Ok((StatusCode::CREATED, Json(ActionView::new(action, now))))
}

async fn get_one(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<ActionView>, ApiError> {
  let action = state.with_repo(move |repo| load_action(repo, id)).await?;
  Ok(Json(ActionView::new(action, state.now())))
}

/// Admin, supervisor o el responsable de la acción.
async fn update(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                ApiJson(update): ApiJson<ActionUpdate>)
                -> Result<Json<ActionView>, ApiError> {
  let now = state.now();
  let (action, previous_assignee) =
    state.with_repo(move |repo| {
           let mut action = load_action(repo, id)?;
           let privileged = matches!(caller.role(), Role::Admin | Role::Supervisor);
           if !privileged && action.assignee_id != Some(caller.id()) {
             return Err(ApiError::forbidden("sólo admin, supervisor o el responsable pueden modificar la acción"));
           }
           let previous_assignee = action.assignee_id;
           update.apply(&mut action, now)?;
           ensure_action_refs(repo, &action)?;
           repo.save_action(action.clone())?;
           Ok((action, previous_assignee))
         })
         .await?;
  let touched: Vec<Uuid> = previous_assignee.into_iter().chain(action.assignee_id).collect();
  state.dashboard.actions_changed(&touched);
  Ok(Json(ActionView::new(action, now)))
}

async fn remove(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  let action = state.with_repo(move |repo| {
                      let action = load_action(repo, id)?;
                      repo.delete_action(&id)?;
                      Ok(action)
                    })
                    .await?;
  state.dashboard.actions_changed(&action.assignee_id.into_iter().collect::<Vec<_>>());
  Ok(StatusCode::NO_CONTENT)
}

/// Éxito parcial: los ids que fallan se listan en `failed`.
async fn bulk_update(State(state): State<AppState>, caller: CurrentUser,
                     ApiJson(request): ApiJson<BulkActionUpdate>)
                     -> Result<Json<BulkUpdateOutcome>, ApiError> {
  caller.require_admin()?;
  request.validate()?;
  let now = state.now();
  let outcome =
    state.with_repo(move |repo| Ok(bulk_update_actions(repo, &request.ids, &request.update, now))).await?;
  if outcome.updated > 0 {
    state.dashboard.actions_changed(&outcome.touched_assignees);
  }
  info!(updated = outcome.updated, failed = outcome.failed.len(), "actualización masiva de acciones");
  Ok(Json(outcome))
}
