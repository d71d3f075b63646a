use std::sync::Arc;

use axum::{
  async_trait,
  body::{to_bytes, Body},
  http::{header, Request, StatusCode},
  Router,
};
use fives_api::{bootstrap_admin, build_router, AppState, Config};
use fives_cache::{Clock, ManualClock};
use fives_domain::{InMemoryAuditRepository, Pillar};
use fives_insights::{ExtractedQuestion, InsightsError, QuestionExtractor};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_KEY: &str = "admin-key-0123456789";

/// Devuelve una pregunta por línea, como `sort: texto`.
struct LineExtractor;

#[async_trait]
impl QuestionExtractor for LineExtractor {
  async fn extract(&self, text: &str) -> Result<Vec<ExtractedQuestion>, InsightsError> {
    Ok(text.lines()
           .filter_map(|l| l.split_once(':'))
           .filter_map(|(cat, q)| {
             cat.parse::<Pillar>().ok().map(|category| ExtractedQuestion { category, text: q.trim().to_string() })
           })
           .collect())
  }
}

fn app() -> (Router, Arc<ManualClock>) {
  let repo = Arc::new(InMemoryAuditRepository::new());
  let clock = Arc::new(ManualClock::default());
  bootstrap_admin(repo.as_ref(), Some(ADMIN_KEY), clock.now()).unwrap();
  let state = AppState::with_extractor(Config::default(), repo, clock.clone(), Arc::new(LineExtractor));
  (build_router(state), clock)
}

async fn send(app: &Router, method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(k) = key {
    req = req.header(header::AUTHORIZATION, format!("Bearer {}", k));
  }
  let req = match body {
    Some(v) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(v.to_string())).unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
  (status, value)
}

async fn create_zone(app: &Router) -> String {
  let (status, zone) = send(app,
                            "POST",
                            "/api/zones",
                            Some(ADMIN_KEY),
                            Some(json!({ "name": "Montaje", "zoneType": "production" }))).await;
  assert_eq!(status, StatusCode::CREATED, "{zone}");
  zone["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, username: &str, role: &str, key: &str) -> String {
  let (status, user) = send(app,
                            "POST",
                            "/api/users",
                            Some(ADMIN_KEY),
                            Some(json!({ "username": username, "role": role, "apiKey": key }))).await;
  assert_eq!(status, StatusCode::CREATED, "{user}");
  user["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn missing_or_unknown_key_is_401_and_inactive_user_is_403() {
  let (app, _) = app();
  assert_eq!(send(&app, "GET", "/api/zones", None, None).await.0, StatusCode::UNAUTHORIZED);
  let (status, body) = send(&app, "GET", "/api/zones", Some("no-existe-0123456789"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());

  let id = create_user(&app, "lucia", "auditor", "lucia-key-0123456789").await;
  assert_eq!(send(&app, "GET", "/api/users/me", Some("lucia-key-0123456789"), None).await.0, StatusCode::OK);
  let (status, _) = send(&app, "DELETE", &format!("/api/users/{id}"), Some(ADMIN_KEY), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert_eq!(send(&app, "GET", "/api/users/me", Some("lucia-key-0123456789"), None).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_cannot_lock_themself_out() {
  let (app, _) = app();
  let (_, me) = send(&app, "GET", "/api/users/me", Some(ADMIN_KEY), None).await;
  let admin_uri = format!("/api/users/{}", me["id"].as_str().unwrap());

  let (status, _) = send(&app, "PUT", &admin_uri, Some(ADMIN_KEY), Some(json!({ "isActive": false }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "DELETE", &admin_uri, Some(ADMIN_KEY), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(send(&app, "GET", "/api/zones", Some(ADMIN_KEY), None).await.0, StatusCode::OK);

  // Otra cuenta con la misma key tampoco se acepta.
  let (status, _) = send(&app,
                         "POST",
                         "/api/users",
                         Some(ADMIN_KEY),
                         Some(json!({ "username": "impostor", "apiKey": ADMIN_KEY }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (_, me_again) = send(&app, "GET", "/api/users/me", Some(ADMIN_KEY), None).await;
  assert_eq!(me_again["id"], me["id"]);
}

#[tokio::test]
async fn roles_are_enforced_on_writes() {
  let (app, _) = app();
  create_user(&app, "operario", "user", "operario-key-0123456789").await;
  let (status, body) = send(&app,
                            "POST",
                            "/api/zones",
                            Some("operario-key-0123456789"),
                            Some(json!({ "name": "Almacén", "zoneType": "warehouse" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(body["error"].as_str().unwrap().contains("user"));
}

#[tokio::test]
async fn dashboard_reflects_todays_audit_and_completion() {
  let (app, _clock) = app();
  let zone = create_zone(&app).await;
  let (status, audit) = send(&app,
                             "POST",
                             "/api/audits",
                             Some(ADMIN_KEY),
                             Some(json!({
                               "title": "Ronda diaria",
                               "zoneId": zone,
                               "scheduledDate": "2024-01-15T09:00:00Z",
                               "items": [{ "category": "sort", "question": "¿Pasillos libres?" }]
                             }))).await;
  assert_eq!(status, StatusCode::CREATED, "{audit}");
  let audit_id = audit["id"].as_str().unwrap().to_string();

  let (_, stats) = send(&app, "GET", "/api/dashboard/stats", Some(ADMIN_KEY), None).await;
  assert!(stats["todaysAudits"].as_u64().unwrap() >= 1);
  assert_eq!(stats["complianceRate"], 0);

  let (status, done) = send(&app,
                            "PUT",
                            &format!("/api/audits/{audit_id}"),
                            Some(ADMIN_KEY),
                            Some(json!({ "status": "completed" }))).await;
  assert_eq!(status, StatusCode::OK, "{done}");
  assert_eq!(done["status"], "completed");

  // Mismo TTL: la escritura ha invalidado el agregado.
  let (_, stats) = send(&app, "GET", "/api/dashboard/stats", Some(ADMIN_KEY), None).await;
  assert_eq!(stats["completedAudits"], 1);
  assert_eq!(stats["complianceRate"], 100);

  let (_, by_zone) = send(&app, "GET", &format!("/api/audits?zoneId={zone}"), Some(ADMIN_KEY), None).await;
  assert_eq!(by_zone.as_array().unwrap().len(), 1);
  assert_eq!(by_zone[0]["status"], "completed");
}

#[tokio::test]
async fn bulk_update_skips_missing_ids() {
  let (app, _) = app();
  let mut ids = Vec::new();
  for title in ["Pintar suelo", "Rotular estantes"] {
    let (status, action) =
      send(&app, "POST", "/api/actions", Some(ADMIN_KEY), Some(json!({ "title": title, "priority": "high" }))).await;
    assert_eq!(status, StatusCode::CREATED, "{action}");
    assert_eq!(action["isOverdue"], false);
    ids.push(action["id"].as_str().unwrap().to_string());
  }
  ids.push(uuid::Uuid::new_v4().to_string());

  let (status, outcome) = send(&app,
                               "POST",
                               "/api/actions/bulk",
                               Some(ADMIN_KEY),
                               Some(json!({ "ids": ids, "update": { "status": "closed" } }))).await;
  assert_eq!(status, StatusCode::OK, "{outcome}");
  assert_eq!(outcome["updated"], 2);
  assert_eq!(outcome["failed"].as_array().unwrap().len(), 1);

  let (_, stats) = send(&app, "GET", "/api/dashboard/stats", Some(ADMIN_KEY), None).await;
  assert_eq!(stats["pendingActions"], 0);

  let (status, _) = send(&app, "POST", "/api/actions/bulk", Some(ADMIN_KEY), Some(json!({ "ids": [], "update": {} }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plain_user_gets_welcome_notification() {
  let (app, _) = app();
  create_user(&app, "nuevo", "user", "nuevo-key-0123456789").await;
  let (status, list) = send(&app, "GET", "/api/notifications", Some("nuevo-key-0123456789"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["type"], "welcome");
}

#[tokio::test]
async fn audit_without_items_is_seeded_and_reported() {
  let (app, _) = app();
  let zone = create_zone(&app).await;
  for (category, text) in [("shine", "¿Máquinas limpias?"), ("sort", "¿Sin material obsoleto?")] {
    let (status, _) =
      send(&app, "POST", "/api/questions", Some(ADMIN_KEY), Some(json!({ "category": category, "text": text }))).await;
    assert_eq!(status, StatusCode::CREATED);
  }
  let (_, audit) = send(&app,
                        "POST",
                        "/api/audits",
                        Some(ADMIN_KEY),
                        Some(json!({ "title": "Con plantilla", "zoneId": zone, "scheduledDate": "2024-01-16T08:00:00Z" }))).await;
  let audit_id = audit["id"].as_str().unwrap().to_string();

  let (_, items) = send(&app, "GET", &format!("/api/audits/{audit_id}/items"), Some(ADMIN_KEY), None).await;
  let items = items.as_array().unwrap().clone();
  assert_eq!(items.len(), 2);
  assert_eq!(items[0]["category"], "sort");

  let item_id = items[0]["id"].as_str().unwrap();
  let (status, answered) = send(&app,
                                "PUT",
                                &format!("/api/audits/{audit_id}/items/{item_id}"),
                                Some(ADMIN_KEY),
                                Some(json!({ "response": "fail", "note": "Cajas en el pasillo" }))).await;
  assert_eq!(status, StatusCode::OK, "{answered}");

  let req = Request::builder().uri(format!("/api/audits/{audit_id}/pdf"))
                              .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
                              .body(Body::empty())
                              .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().contains(&format!("audit-{audit_id}.txt")));
  let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
  assert!(text.contains("Note: Cajas en el pasillo"));
}

/// PDF de una página con una línea de texto por pregunta.
fn checklist_pdf(lines: &[&str]) -> Vec<u8> {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let font_id = doc.add_object(dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica" });
  let mut operations = Vec::new();
  for (i, line) in lines.iter().enumerate() {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
    operations.push(Operation::new("Td", vec![72.into(), (720 - 16 * i as i64).into()]));
    operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    operations.push(Operation::new("ET", vec![]));
  }
  let content_id = doc.add_object(Stream::new(dictionary! {}, Content { operations }.encode().unwrap()));
  let page_id = doc.add_object(dictionary! {
    "Type" => "Page",
    "Parent" => pages_id,
    "Contents" => content_id,
    "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
  });
  doc.objects.insert(pages_id,
                     Object::Dictionary(dictionary! {
                       "Type" => "Pages",
                       "Kids" => vec![page_id.into()],
                       "Count" => 1,
                       "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                     }));
  let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
  doc.trailer.set("Root", catalog_id);
  let mut out = Vec::new();
  doc.save_to(&mut out).unwrap();
  out
}

#[tokio::test]
async fn pdf_questions_are_extracted_and_saved() {
  let pdf = checklist_pdf(&["sort: Are aisles clear?", "shine: Is the floor clean?"]);

  let (app, _) = app();
  let req = Request::builder().method("POST")
                              .uri("/api/questions/extract-pdf?save=true")
                              .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
                              .header(header::CONTENT_TYPE, "application/pdf")
                              .body(Body::from(pdf))
                              .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
  assert_eq!(body["questions"].as_array().unwrap().len(), 2);
  assert_eq!(body["saved"].as_array().unwrap().len(), 2);

  let (_, questions) = send(&app, "GET", "/api/questions", Some(ADMIN_KEY), None).await;
  assert_eq!(questions.as_array().unwrap().len(), 2);

  let (status, _) = send(&app, "POST", "/api/questions/extract-pdf", Some(ADMIN_KEY), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
