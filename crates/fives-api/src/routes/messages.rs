// messages.rs
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use fives_domain::{ensure_user, AuditRepository, Message, MessageDraft, MessageUpdate, RecordStore};
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath},
  state::AppState,
};

pub fn router() -> Router<AppState> {
  Router::new().route("/", get(list).post(send))
               .route("/:id", get(get_one).put(mark).delete(remove))
}

/// Mensaje visible para el llamador: participante o admin.
fn load_visible(repo: &dyn AuditRepository, caller: &CurrentUser, id: Uuid) -> Result<Message, ApiError> {
  let msg = repo.fetch_record::<Message>(&id)?.ok_or_else(|| ApiError::not_found("mensaje", id))?;
  if caller.is_admin() || msg.involves(caller.id()) {
    Ok(msg)
  } else {
    Err(ApiError::forbidden("sólo los participantes pueden ver este mensaje"))
  }
}

async fn list(State(state): State<AppState>, caller: CurrentUser) -> Result<Json<Vec<Message>>, ApiError> {
  let mut messages = state.with_repo(|repo| Ok(repo.fetch_records::<Message>()?)).await?;
  if !caller.is_admin() {
    messages.retain(|m| m.involves(caller.id()));
  }
  messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Ok(Json(messages))
}

async fn send(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<MessageDraft>)
              -> Result<(StatusCode, Json<Message>), ApiError> {
  let msg = Message::new(caller.id(), draft, state.now())?;
  let stored = msg.clone();
  state.with_repo(move |repo| {
         ensure_user(repo, &stored.recipient_id)?;
         Ok(repo.put_record(&stored)?)
       })
       .await?;
  Ok((StatusCode::CREATED, Json(msg)))
}

async fn get_one(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<Message>, ApiError> {
  Ok(Json(state.with_repo(move |repo| load_visible(repo, &caller, id)).await?))
}

/// Sólo el destinatario cambia la marca de lectura.
async fn mark(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
              ApiJson(update): ApiJson<MessageUpdate>)
              -> Result<Json<Message>, ApiError> {
  let msg = state.with_repo(move |repo| {
                   let mut msg = load_visible(repo, &caller, id)?;
                   if msg.recipient_id != caller.id() {
                     return Err(ApiError::forbidden("sólo el destinatario puede marcar el mensaje"));
                   }
                   msg.is_read = update.is_read;
                   repo.put_record(&msg)?;
                   Ok(msg)
                 })
                 .await?;
  Ok(Json(msg))
}

async fn remove(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                -> Result<StatusCode, ApiError> {
  state.with_repo(move |repo| {
         let msg = load_visible(repo, &caller, id)?;
         if !msg.involves(caller.id()) {
           return Err(ApiError::forbidden("sólo los participantes pueden borrar el mensaje"));
         }
         repo.remove_record::<Message>(&id)?;
         Ok(())
       })
       .await?;
  Ok(StatusCode::NO_CONTENT)
}
