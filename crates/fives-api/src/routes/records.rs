// records.rs
//! CRUD genérico de los registros auxiliares (programaciones, informes,
//! etiquetas, preguntas, reglas de notificación) más sus rutas propias.
use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Json, Router};
use fives_domain::{
  ensure_record_refs, Drafted, NotificationRule, Question, RecordStore, Report, Role, Schedule, Tag, User,
};
use fives_insights::{evaluate_rule, pdf_text, ExtractedQuestion, RuleTestOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath, ApiQuery},
  state::{blocking, AppState},
};

/// Registro expuesto como recurso REST.
pub trait RecordRoute: Drafted {
  /// Nombre en los mensajes de error.
  const LABEL: &'static str;
  /// Roles que pueden crear, modificar y borrar.
  const WRITERS: &'static [Role];
}

impl RecordRoute for Schedule {
  const LABEL: &'static str = "programación";
  const WRITERS: &'static [Role] = &[Role::Admin];
}

impl RecordRoute for Report {
  const LABEL: &'static str = "informe";
  const WRITERS: &'static [Role] = &[Role::Admin, Role::Supervisor];
}

impl RecordRoute for Tag {
  const LABEL: &'static str = "etiqueta";
  const WRITERS: &'static [Role] = &[Role::Admin];
}

impl RecordRoute for Question {
  const LABEL: &'static str = "pregunta";
  const WRITERS: &'static [Role] = &[Role::Admin];
}

impl RecordRoute for NotificationRule {
  const LABEL: &'static str = "regla de notificación";
  const WRITERS: &'static [Role] = &[Role::Admin];
}

pub fn router<T: RecordRoute>() -> Router<AppState> {
  Router::new().route("/", get(list::<T>).post(create::<T>))
               .route("/:id", get(get_one::<T>).put(update::<T>).delete(remove::<T>))
}

async fn list<T: RecordRoute>(State(state): State<AppState>, _caller: CurrentUser) -> Result<Json<Vec<T>>, ApiError> {
  Ok(Json(state.with_repo(|repo| Ok(repo.fetch_records::<T>()?)).await?))
}

async fn create<T: RecordRoute>(State(state): State<AppState>, caller: CurrentUser, ApiJson(draft): ApiJson<T::Draft>)
                                -> Result<(StatusCode, Json<T>), ApiError> {
  caller.require(T::WRITERS)?;
  let mut record = T::from_draft(draft, state.now())?;
  record.set_author(caller.id());
  let stored = record.clone();
  state.with_repo(move |repo| {
         ensure_record_refs(repo, &stored)?;
         Ok(repo.put_record(&stored)?)
       })
       .await?;
  Ok((StatusCode::CREATED, Json(record)))
}

async fn get_one<T: RecordRoute>(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                                 -> Result<Json<T>, ApiError> {
  let record = state.with_repo(move |repo| Ok(repo.fetch_record::<T>(&id)?)).await?;
  record.map(Json).ok_or_else(|| ApiError::not_found(T::LABEL, id))
}

/// `PUT` reemplaza los campos editables con el borrador completo.
async fn update<T: RecordRoute>(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                                ApiJson(draft): ApiJson<T::Draft>)
                                -> Result<Json<T>, ApiError> {
  caller.require(T::WRITERS)?;
  let now = state.now();
  let record = state.with_repo(move |repo| {
                      let mut record = repo.fetch_record::<T>(&id)?.ok_or_else(|| ApiError::not_found(T::LABEL, id))?;
                      record.apply_draft(draft, now)?;
                      ensure_record_refs(repo, &record)?;
                      repo.put_record(&record)?;
                      Ok(record)
                    })
                    .await?;
  Ok(Json(record))
}

async fn remove<T: RecordRoute>(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                                -> Result<StatusCode, ApiError> {
  caller.require(T::WRITERS)?;
  if !state.with_repo(move |repo| Ok(repo.remove_record::<T>(&id)?)).await? {
    return Err(ApiError::not_found(T::LABEL, id));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/notification-rules/:id/test`
pub async fn test_rule(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                       -> Result<Json<RuleTestOutcome>, ApiError> {
  caller.require_admin()?;
  let now = state.now();
  let outcome = state.with_repo(move |repo| {
                       let rule = repo.fetch_record::<NotificationRule>(&id)?
                                      .ok_or_else(|| ApiError::not_found(NotificationRule::LABEL, id))?;
                       let audits = repo.list_audits()?;
                       let actions = repo.list_actions()?;
                       let users: Vec<User> = repo.list_users()?;
                       Ok(evaluate_rule(&rule, &audits, &actions, &users, now))
                     })
                     .await?;
  Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractOptions {
  /// Guarda las preguntas extraídas como activas para todas las zonas.
  #[serde(default)]
  save: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
  questions: Vec<ExtractedQuestion>,
  saved: Vec<Question>,
}

/// `POST /api/questions/extract-pdf` con el PDF como cuerpo.
pub async fn extract_questions(State(state): State<AppState>, caller: CurrentUser,
                               ApiQuery(options): ApiQuery<ExtractOptions>, body: Bytes)
                               -> Result<Json<ExtractResponse>, ApiError> {
  caller.require_admin()?;
  let text = blocking(move || Ok(pdf_text(&body)?)).await?;
  let questions = state.extractor.extract(&text).await?;
  info!(count = questions.len(), "preguntas extraídas del PDF");

  let saved = if options.save && !questions.is_empty() {
    let now = state.now();
    let to_save = questions.clone();
    state.with_repo(move |repo| {
           let offset = repo.fetch_records::<Question>()?.len() as i32;
           let mut saved = Vec::with_capacity(to_save.len());
           for (i, q) in to_save.into_iter().enumerate() {
             let question = Question::from_draft(q.into_draft(offset + i as i32), now)?;
             repo.put_record(&question)?;
             saved.push(question);
           }
           Ok(saved)
         })
         .await?
  } else {
    Vec::new()
  };
  Ok(Json(ExtractResponse { questions, saved }))
}
