// audits.rs
use std::sync::Arc;

use axum::{
  extract::State,
  http::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    StatusCode,
  },
  response::IntoResponse,
  routing::{get, put},
  Json, Router,
};
use fives_domain::{
  ensure_user, ensure_zone, seed_checklist, Audit, AuditRepository, AuditStatus, AuditUpdate, ChecklistAnswer,
  ChecklistItem, NewAudit, Question, RecordStore, Role,
};
use fives_insights::{render_audit_report, report_filename};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath, ApiQuery},
  state::{blocking, AppState},
};

pub fn router() -> Router<AppState> {
  Router::new().route("/", get(list).post(create))
               .route("/:id", get(get_one).put(update).delete(remove))
               .route("/:id/items", get(list_items))
               .route("/:id/items/:item_id", put(answer_item))
               .route("/:id/pdf", get(download_report))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditFilter {
  zone_id: Option<Uuid>,
}

fn load_audit(repo: &dyn AuditRepository, id: Uuid) -> Result<Audit, ApiError> {
  repo.get_audit(&id)?.ok_or_else(|| ApiError::not_found("auditoría", id))
}

/// Admin, supervisor o el auditor asignado.
fn can_edit(caller: &CurrentUser, audit: &Audit) -> Result<(), ApiError> {
  if matches!(caller.role(), Role::Admin | Role::Supervisor) || audit.auditor_id == Some(caller.id()) {
    Ok(())
  } else {
    Err(ApiError::forbidden("sólo admin, supervisor o el auditor asignado pueden modificar la auditoría"))
  }
}

async fn list(State(state): State<AppState>, _caller: CurrentUser, ApiQuery(filter): ApiQuery<AuditFilter>)
              -> Result<Json<Vec<Audit>>, ApiError> {
  match filter.zone_id {
    Some(zone) => {
      let dashboard = state.dashboard.clone();
      let list = blocking(move || Ok(dashboard.audits_for_zone(&zone)?)).await?;
      Ok(Json(Arc::unwrap_or_clone(list)))
    }
    None => Ok(Json(state.with_repo(|repo| Ok(repo.list_audits()?)).await?)),
  }
}

/// Sin `items` el checklist se siembra con las preguntas activas de la zona.
async fn create(State(state): State<AppState>, caller: CurrentUser, ApiJson(mut draft): ApiJson<NewAudit>)
                -> Result<(StatusCode, Json<Audit>), ApiError> {
  caller.require(&[Role::Admin, Role::Supervisor])?;
  let now = state.now();
  let audit = state.with_repo(move |repo| {
                     ensure_zone(repo, &draft.zone_id)?;
                     if let Some(auditor) = draft.auditor_id {
                       ensure_user(repo, &auditor)?;
                     }
                     if draft.items.is_none() {
                       let questions: Vec<Question> = repo.fetch_records()?;
                       draft.items = Some(seed_checklist(&questions, draft.zone_id));
                     }
                     let (audit, items) = draft.into_audit(now)?;
                     repo.create_audit_with_items(audit.clone(), items.unwrap_or_default())?;
                     Ok(audit)
                   })
                   .await?;
  state.dashboard.audits_changed(&[audit.zone_id]);
  info!(audit_id = %audit.id, zone_id = %audit.zone_id, "auditoría programada");
  Ok((StatusCode::CREATED, Json(audit)))
}

async fn get_one(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                 -> Result<Json<Audit>, ApiError> {
  Ok(Json(state.with_repo(move |repo| load_audit(repo, id)).await?))
}

async fn update(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>,
                ApiJson(update): ApiJson<AuditUpdate>)
                -> Result<Json<Audit>, ApiError> {
  let now = state.now();
  let (audit, previous_zone) = state.with_repo(move |repo| {
                                      let mut audit = load_audit(repo, id)?;
                                      can_edit(&caller, &audit)?;
                                      let previous_zone = audit.zone_id;
                                      let items = repo.list_checklist_items(&id)?;
                                      update.apply(&mut audit, &items, now)?;
                                      if audit.zone_id != previous_zone {
                                        ensure_zone(repo, &audit.zone_id)?;
                                      }
                                      if let Some(auditor) = audit.auditor_id {
                                        ensure_user(repo, &auditor)?;
                                      }
                                      repo.update_audit(audit.clone())?;
                                      Ok((audit, previous_zone))
                                    })
                                    .await?;
  state.dashboard.audits_changed(&[previous_zone, audit.zone_id]);
  if audit.status == AuditStatus::Completed {
    info!(audit_id = %audit.id, score = ?audit.overall_score, "auditoría completada");
  }
  Ok(Json(audit))
}

/// Borra la auditoría con sus ítems; las acciones ligadas quedan sueltas.
async fn remove(State(state): State<AppState>, caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  let (zone, assignees) = state.with_repo(move |repo| {
                                 let audit = load_audit(repo, id)?;
                                 let assignees: Vec<Uuid> = repo.list_actions()?
                                                                .into_iter()
                                                                .filter(|a| a.audit_id == Some(id))
                                                                .filter_map(|a| a.assignee_id)
                                                                .collect();
                                 repo.delete_audit(&id)?;
                                 Ok((audit.zone_id, assignees))
                               })
                               .await?;
  state.dashboard.audits_changed(&[zone]);
  state.dashboard.actions_changed(&assignees);
  Ok(StatusCode::NO_CONTENT)
}

async fn list_items(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                    -> Result<Json<Vec<ChecklistItem>>, ApiError> {
  let items = state.with_repo(move |repo| {
                     load_audit(repo, id)?;
                     Ok(repo.list_checklist_items(&id)?)
                   })
                   .await?;
  Ok(Json(items))
}

/// Responde un ítem. Las auditorías completadas son de sólo lectura.
async fn answer_item(State(state): State<AppState>, caller: CurrentUser,
                     ApiPath((audit_id, item_id)): ApiPath<(Uuid, Uuid)>, ApiJson(answer): ApiJson<ChecklistAnswer>)
                     -> Result<Json<ChecklistItem>, ApiError> {
  let item = state.with_repo(move |repo| {
                    let audit = load_audit(repo, audit_id)?;
                    can_edit(&caller, &audit)?;
                    if audit.is_completed() {
                      return Err(ApiError::BadRequest("la auditoría está completada".into()));
                    }
                    let mut item = repo.get_checklist_item(&item_id)?
                                       .filter(|i| i.audit_id == audit_id)
                                       .ok_or_else(|| ApiError::not_found("ítem", item_id))?;
                    answer.apply(&mut item)?;
                    repo.update_checklist_item(item.clone())?;
                    Ok(item)
                  })
                  .await?;
  Ok(Json(item))
}

/// Informe descargable en texto plano.
async fn download_report(State(state): State<AppState>, _caller: CurrentUser, ApiPath(id): ApiPath<Uuid>)
                         -> Result<impl IntoResponse, ApiError> {
  let (filename, body) = state.with_repo(move |repo| {
                                let audit = load_audit(repo, id)?;
                                let zone = repo.get_zone(&audit.zone_id)?;
                                let auditor = match audit.auditor_id {
                                  Some(a) => repo.get_user(&a)?,
                                  None => None,
                                };
                                let items = repo.list_checklist_items(&id)?;
                                let body = render_audit_report(&audit, zone.as_ref(), auditor.as_ref(), &items);
                                Ok((report_filename(&audit), body))
                              })
                              .await?;
  let disposition = format!("attachment; filename=\"{}\"", filename);
  Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8".to_string()), (CONTENT_DISPOSITION, disposition)], body))
}
