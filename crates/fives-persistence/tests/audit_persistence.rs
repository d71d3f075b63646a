// Tests sobre SQLite en fichero temporal; con la feature `pg` no aplican.
#![cfg(not(feature = "pg"))]

use chrono::{Duration, TimeZone, Utc};
use fives_domain::{ActionPriority, ActionStatus, ActionUpdate, AuditRepository, AuditStatus, AuditUpdate, ChecklistAnswer,
                   ChecklistResponse, DomainError, Drafted, NewAction, NewAudit, NewChecklistItem, NewUser, NewZone, Pillar,
                   RecordStore, Tag, TagDraft};
use fives_persistence::DieselAuditRepository;
use tempfile::TempDir;

fn open_repo() -> (TempDir, DieselAuditRepository) {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("fives_test.db");
  let repo = DieselAuditRepository::new(path.to_str().expect("ruta utf-8")).expect("abrir repo sqlite");
  (dir, repo)
}

fn zone(repo: &DieselAuditRepository, name: &str) -> uuid::Uuid {
  let z = NewZone { name: name.into(),
                    zone_type: "production".into(),
                    building: Some("B1".into()),
                    floor: None,
                    description: None }.into_zone(Utc::now())
                                       .unwrap();
  repo.save_zone(z).unwrap()
}

fn item(question: &str) -> NewChecklistItem {
  NewChecklistItem { question_id: None,
                     category: Pillar::Shine,
                     question: question.into(),
                     response: None,
                     note: None,
                     photo: None,
                     tags: vec!["limpieza".into()] }
}

#[test]
fn audit_lifecycle_with_items_and_cascade() {
  let (_dir, repo) = open_repo();
  let z = zone(&repo, "Línea 1");
  let when = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
  let (audit, items) = NewAudit { title: "Auditoría semanal".into(),
                                  zone_id: z,
                                  auditor_id: None,
                                  scheduled_date: when,
                                  notes: None,
                                  items: Some(vec![item("¿Suelo limpio?"), item("¿Máquinas limpias?")]) }.into_audit(when)
                                                                                                          .unwrap();
  let items = items.unwrap();
  let audit_id = repo.create_audit_with_items(audit, items.clone()).unwrap();

  let stored = repo.list_checklist_items(&audit_id).unwrap();
  assert_eq!(stored.iter().map(|i| i.question.as_str()).collect::<Vec<_>>(), vec!["¿Suelo limpio?", "¿Máquinas limpias?"]);
  assert_eq!(stored[0].tags, vec!["limpieza".to_string()]);

  let mut first = stored[0].clone();
  ChecklistAnswer { response: Some(Some(ChecklistResponse::Pass)), ..Default::default() }.apply(&mut first).unwrap();
  repo.update_checklist_item(first.clone()).unwrap();
  let mut second = stored[1].clone();
  ChecklistAnswer { response: Some(Some(ChecklistResponse::Fail)), ..Default::default() }.apply(&mut second).unwrap();
  repo.update_checklist_item(second).unwrap();

  let mut audit = repo.get_audit(&audit_id).unwrap().unwrap();
  let items_now = repo.list_checklist_items(&audit_id).unwrap();
  AuditUpdate { status: Some(AuditStatus::Completed), ..Default::default() }.apply(&mut audit, &items_now, when).unwrap();
  repo.update_audit(audit).unwrap();
  let done = repo.get_audit(&audit_id).unwrap().unwrap();
  assert_eq!(done.status, AuditStatus::Completed);
  assert_eq!(done.overall_score, Some(50));
  assert_eq!(done.completed_at, Some(when));

  assert_eq!(repo.list_audits_for_zone(&z).unwrap().len(), 1);
  assert!(repo.delete_audit(&audit_id).unwrap());
  assert!(repo.list_checklist_items(&audit_id).unwrap().is_empty());
  assert!(repo.get_checklist_item(&first.id).unwrap().is_none());
}

#[test]
fn duplicate_audit_insert_leaves_no_partial_items() {
  let (_dir, repo) = open_repo();
  let z = zone(&repo, "Almacén");
  let (audit, items) = NewAudit { title: "A".into(),
                                  zone_id: z,
                                  auditor_id: None,
                                  scheduled_date: Utc::now(),
                                  notes: None,
                                  items: Some(vec![item("uno")]) }.into_audit(Utc::now())
                                                                  .unwrap();
  let items = items.unwrap();
  repo.create_audit_with_items(audit.clone(), items).unwrap();

  // Mismo id de auditoría con ítems nuevos: la transacción debe revertirse.
  let fresh = vec![item("dos").into_item(audit.id).unwrap(), item("tres").into_item(audit.id).unwrap()];
  assert!(repo.create_audit_with_items(audit.clone(), fresh).is_err());
  assert_eq!(repo.list_checklist_items(&audit.id).unwrap().len(), 1);
}

#[test]
fn actions_round_trip_and_zone_guard() {
  let (_dir, repo) = open_repo();
  let z = zone(&repo, "Taller");
  let user = NewUser { username: "pedro".into(),
                       display_name: None,
                       email: None,
                       role: fives_domain::Role::Auditor,
                       team_id: None,
                       zone_ids: vec![z],
                       language: "es".into(),
                       theme: "dark".into(),
                       api_key: "pedro-key-0123456789".into() }.into_user(Utc::now())
                                                               .unwrap();
  let user_id = repo.save_user(user.clone()).unwrap();
  let by_key = repo.find_user_by_api_key_hash(&fives_domain::hash_api_key("pedro-key-0123456789")).unwrap();
  assert_eq!(by_key.map(|u| u.zone_ids), Some(vec![z]));

  let now = Utc::now();
  let mut action = NewAction { title: "Pintar líneas de paso".into(),
                               description: Some("pasillo norte".into()),
                               audit_id: None,
                               checklist_item_id: None,
                               assignee_id: Some(user_id),
                               zone_id: Some(z),
                               priority: ActionPriority::Critical,
                               due_date: Some(now - Duration::days(2)) }.into_action(now)
                                                                         .unwrap();
  let action_id = repo.save_action(action.clone()).unwrap();
  assert!(repo.get_action(&action_id).unwrap().unwrap().is_overdue(now));

  assert!(matches!(repo.delete_zone(&z), Err(DomainError::ValidationError(_))));

  let update: ActionUpdate = serde_json::from_value(serde_json::json!({ "status": "closed", "description": null })).unwrap();
  update.apply(&mut action, now).unwrap();
  repo.save_action(action).unwrap();
  let closed = repo.get_action(&action_id).unwrap().unwrap();
  assert_eq!(closed.status, ActionStatus::Closed);
  assert_eq!(closed.description, None);
  assert!(closed.closed_at.is_some());
  assert_eq!(repo.list_actions_for_assignee(&user_id).unwrap().len(), 1);

  assert!(repo.delete_action(&action_id).unwrap());
  assert!(repo.delete_zone(&z).unwrap());
}

#[test]
fn duplicate_username_is_a_validation_error() {
  let (_dir, repo) = open_repo();
  let mk = || {
    let draft: NewUser =
      serde_json::from_value(serde_json::json!({ "username": "maria", "apiKey": "maria-key-0123456789" })).unwrap();
    draft.into_user(Utc::now()).unwrap()
  };
  repo.save_user(mk()).unwrap();
  assert!(matches!(repo.save_user(mk()), Err(DomainError::ValidationError(_))));
}

#[test]
fn records_are_scoped_by_kind() {
  let (_dir, repo) = open_repo();
  let mut tag = Tag::from_draft(TagDraft { name: "seguridad".into(), color: "#ff0000".into() }, Utc::now()).unwrap();
  repo.put_record(&tag).unwrap();
  tag.color = "#00ff00".into();
  repo.put_record(&tag).unwrap();

  let all: Vec<Tag> = repo.fetch_records().unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].color, "#00ff00");
  assert!(repo.fetch_record::<fives_domain::Report>(&tag.id).unwrap().is_none());
  assert!(repo.remove_record::<Tag>(&tag.id).unwrap());
  assert!(!repo.remove_record::<Tag>(&tag.id).unwrap());
}

#[test]
fn api_key_is_unique_across_users() {
  let (_dir, repo) = open_repo();
  let mk = |username: &str| {
    let draft: NewUser =
      serde_json::from_value(serde_json::json!({ "username": username, "apiKey": "shared-key-0123456789" })).unwrap();
    draft.into_user(Utc::now()).unwrap()
  };
  let admin = mk("admin");
  repo.save_user(admin.clone()).unwrap();
  assert!(matches!(repo.save_user(mk("bob")), Err(DomainError::ValidationError(_))));
  let owner = repo.find_user_by_api_key_hash(&admin.api_key_hash).unwrap().unwrap();
  assert_eq!(owner.username, "admin");
  // Re-guardar al mismo usuario con su key sigue siendo un update.
  repo.save_user(admin).unwrap();
}
