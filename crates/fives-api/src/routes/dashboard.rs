// dashboard.rs
use axum::{extract::State, routing::get, Json, Router};
use fives_insights::{notifications_for, DashboardStats, Notification};

use crate::{
  auth::CurrentUser,
  error::ApiError,
  state::{blocking, AppState},
};

pub fn router() -> Router<AppState> {
  Router::new().route("/dashboard/stats", get(stats))
               .route("/notifications", get(notifications))
}

async fn stats(State(state): State<AppState>, _caller: CurrentUser) -> Result<Json<DashboardStats>, ApiError> {
  let dashboard = state.dashboard.clone();
  Ok(Json(blocking(move || Ok(dashboard.stats()?)).await?))
}

/// Siempre 200: si el almacenamiento falla la lista llega vacía.
async fn notifications(State(state): State<AppState>, caller: CurrentUser) -> Result<Json<Vec<Notification>>, ApiError> {
  let now = state.now();
  let (user_id, role) = (caller.id(), caller.role());
  Ok(Json(state.with_repo(move |repo| Ok(notifications_for(repo, user_id, role, now))).await?))
}
