use crate::schema::{actions, audits, checklist_items, records, teams, users, zones};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use fives_domain::{Action, Audit, AuditRepository, ChecklistItem, DomainError, RecordKind, Team, User, Zone};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;

// busy_timeout es por conexión: se fija cada vez que el pool entrega una.
#[cfg(not(feature = "pg"))]
#[derive(Debug)]
struct SqlitePragmas;
#[cfg(not(feature = "pg"))]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(conn).map_err(diesel::r2d2::Error::QueryError)?;
    Ok(())
  }
}

/// Repo Diesel que implementa `AuditRepository`.
#[derive(Clone)]
pub struct DieselAuditRepository {
  pool: Arc<DbPool>,
}

impl DieselAuditRepository {
  /// Abre el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<DbConn>::new(database_url);
    let builder = Pool::builder().max_size(4);
    #[cfg(not(feature = "pg"))]
    let builder = builder.connection_customizer(Box::new(SqlitePragmas));
    let pool = builder.build(manager).map_err(|e| DomainError::StorageError(format!("pool: {}", e)))?;
    let repo = DieselAuditRepository { pool: Arc::new(pool) };
    let mut conn = repo.conn()?;
    #[cfg(not(feature = "pg"))]
    {
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut conn);
    }
    let applied = conn.run_pending_migrations(MIGRATIONS)
                      .map_err(|e| DomainError::StorageError(format!("migraciones: {}", e)))?;
    if !applied.is_empty() {
      log::info!("fives-persistence: {} migraciones aplicadas", applied.len());
    }
    Ok(repo)
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.pool.get().map_err(|e| DomainError::StorageError(format!("pool: {}", e)))
  }
}

/// Construye el repositorio a partir de `DATABASE_URL` (cargando `.env`).
pub fn new_from_env() -> Result<DieselAuditRepository, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("DATABASE_URL").map_err(|_| DomainError::StorageError("DATABASE_URL not set".into()))?;
  #[cfg(feature = "pg")]
  if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
    return Err(DomainError::StorageError("fives-persistence: DATABASE_URL no parece una URL de Postgres".into()));
  }
  log::debug!("fives-persistence: abriendo {}", url);
  DieselAuditRepository::new(&url)
}

// Errores dentro de una transacción: Diesel o de dominio.
enum TxError {
  Db(DieselError),
  Domain(DomainError),
}

impl From<DieselError> for TxError {
  fn from(e: DieselError) -> Self {
    TxError::Db(e)
  }
}

impl From<TxError> for DomainError {
  fn from(e: TxError) -> Self {
    match e {
      TxError::Db(e) => db_err(e),
      TxError::Domain(e) => e,
    }
  }
}

fn db_err(e: DieselError) -> DomainError {
  match e {
    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
      DomainError::validation(format!("valor duplicado: {}", info.message()))
    }
    other => DomainError::StorageError(format!("db: {}", other)),
  }
}

fn map_db_err<T>(res: Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(db_err)
}

fn ts(dt: DateTime<Utc>) -> i64 {
  dt.timestamp_millis()
}

fn from_ts(ms: i64) -> Result<DateTime<Utc>, DomainError> {
  DateTime::from_timestamp_millis(ms).ok_or_else(|| DomainError::StorageError(format!("timestamp inválido: {}", ms)))
}

fn from_opt_ts(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, DomainError> {
  ms.map(from_ts).transpose()
}

fn parse_id(s: &str) -> Result<Uuid, DomainError> {
  Uuid::parse_str(s).map_err(|e| DomainError::StorageError(format!("invalid uuid {}: {}", s, e)))
}

fn parse_opt_id(s: Option<String>) -> Result<Option<Uuid>, DomainError> {
  s.as_deref().map(parse_id).transpose()
}

fn parse_enum<T: FromStr<Err = DomainError>>(s: &str) -> Result<T, DomainError> {
  s.parse().map_err(|e: DomainError| DomainError::StorageError(e.to_string()))
}

fn to_json<T: Serialize>(v: &T) -> Result<String, DomainError> {
  Ok(serde_json::to_string(v)?)
}

fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, DomainError> {
  Ok(serde_json::from_str(s)?)
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = users, treat_none_as_null = true)]
struct UserRow {
  id: String,
  username: String,
  display_name: Option<String>,
  email: Option<String>,
  role: String,
  team_id: Option<String>,
  zone_ids: String,
  language: String,
  theme: String,
  is_active: bool,
  api_key_hash: String,
  created_at_ts: i64,
  updated_at_ts: i64,
}

impl UserRow {
  fn from_domain(u: &User) -> Result<Self, DomainError> {
    Ok(UserRow { id: u.id.to_string(),
                 username: u.username.clone(),
                 display_name: u.display_name.clone(),
                 email: u.email.clone(),
                 role: u.role.as_str().to_string(),
                 team_id: u.team_id.map(|t| t.to_string()),
                 zone_ids: to_json(&u.zone_ids)?,
                 language: u.language.clone(),
                 theme: u.theme.clone(),
                 is_active: u.is_active,
                 api_key_hash: u.api_key_hash.clone(),
                 created_at_ts: ts(u.created_at),
                 updated_at_ts: ts(u.updated_at) })
  }

  fn into_domain(self) -> Result<User, DomainError> {
    Ok(User { id: parse_id(&self.id)?,
              username: self.username,
              display_name: self.display_name,
              email: self.email,
              role: parse_enum(&self.role)?,
              team_id: parse_opt_id(self.team_id)?,
              zone_ids: from_json(&self.zone_ids)?,
              language: self.language,
              theme: self.theme,
              is_active: self.is_active,
              api_key_hash: self.api_key_hash,
              created_at: from_ts(self.created_at_ts)?,
              updated_at: from_ts(self.updated_at_ts)? })
  }
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = zones, treat_none_as_null = true)]
struct ZoneRow {
  id: String,
  name: String,
  zone_type: String,
  building: Option<String>,
  floor: Option<String>,
  description: Option<String>,
  is_active: bool,
  created_at_ts: i64,
}

impl ZoneRow {
  fn from_domain(z: &Zone) -> Self {
    ZoneRow { id: z.id.to_string(),
              name: z.name.clone(),
              zone_type: z.zone_type.clone(),
              building: z.building.clone(),
              floor: z.floor.clone(),
              description: z.description.clone(),
              is_active: z.is_active,
              created_at_ts: ts(z.created_at) }
  }

  fn into_domain(self) -> Result<Zone, DomainError> {
    Ok(Zone { id: parse_id(&self.id)?,
              name: self.name,
              zone_type: self.zone_type,
              building: self.building,
              floor: self.floor,
              description: self.description,
              is_active: self.is_active,
              created_at: from_ts(self.created_at_ts)? })
  }
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = teams, treat_none_as_null = true)]
struct TeamRow {
  id: String,
  name: String,
  description: Option<String>,
  leader_id: Option<String>,
  member_ids: String,
  zone_ids: String,
  responsibilities: String,
  created_at_ts: i64,
}

impl TeamRow {
  fn from_domain(t: &Team) -> Result<Self, DomainError> {
    Ok(TeamRow { id: t.id.to_string(),
                 name: t.name.clone(),
                 description: t.description.clone(),
                 leader_id: t.leader_id.map(|l| l.to_string()),
                 member_ids: to_json(&t.member_ids)?,
                 zone_ids: to_json(&t.zone_ids)?,
                 responsibilities: to_json(&t.responsibilities)?,
                 created_at_ts: ts(t.created_at) })
  }

  fn into_domain(self) -> Result<Team, DomainError> {
    Ok(Team { id: parse_id(&self.id)?,
              name: self.name,
              description: self.description,
              leader_id: parse_opt_id(self.leader_id)?,
              member_ids: from_json(&self.member_ids)?,
              zone_ids: from_json(&self.zone_ids)?,
              responsibilities: from_json(&self.responsibilities)?,
              created_at: from_ts(self.created_at_ts)? })
  }
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = audits, treat_none_as_null = true)]
struct AuditRow {
  id: String,
  title: String,
  zone_id: String,
  auditor_id: Option<String>,
  status: String,
  scheduled_ts: i64,
  started_at_ts: Option<i64>,
  completed_at_ts: Option<i64>,
  overall_score: Option<i32>,
  notes: Option<String>,
  created_at_ts: i64,
}

impl AuditRow {
  fn from_domain(a: &Audit) -> Self {
    AuditRow { id: a.id.to_string(),
               title: a.title.clone(),
               zone_id: a.zone_id.to_string(),
               auditor_id: a.auditor_id.map(|u| u.to_string()),
               status: a.status.as_str().to_string(),
               scheduled_ts: ts(a.scheduled_date),
               started_at_ts: a.started_at.map(ts),
               completed_at_ts: a.completed_at.map(ts),
               overall_score: a.overall_score.map(i32::from),
               notes: a.notes.clone(),
               created_at_ts: ts(a.created_at) }
  }

  fn into_domain(self) -> Result<Audit, DomainError> {
    let overall_score = match self.overall_score {
      Some(s) => Some(u8::try_from(s).map_err(|_| DomainError::StorageError(format!("overall_score inválido: {}", s)))?),
      None => None,
    };
    Ok(Audit { id: parse_id(&self.id)?,
               title: self.title,
               zone_id: parse_id(&self.zone_id)?,
               auditor_id: parse_opt_id(self.auditor_id)?,
               status: parse_enum(&self.status)?,
               scheduled_date: from_ts(self.scheduled_ts)?,
               started_at: from_opt_ts(self.started_at_ts)?,
               completed_at: from_opt_ts(self.completed_at_ts)?,
               overall_score,
               notes: self.notes,
               created_at: from_ts(self.created_at_ts)? })
  }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = checklist_items)]
struct ItemRow {
  id: String,
  audit_id: String,
  position: i64,
  question_id: Option<String>,
  category: String,
  question: String,
  response: Option<String>,
  note: Option<String>,
  photo: Option<String>,
  tags: String,
}

impl ItemRow {
  fn from_domain(i: &ChecklistItem, position: i64) -> Result<Self, DomainError> {
    Ok(ItemRow { id: i.id.to_string(),
                 audit_id: i.audit_id.to_string(),
                 position,
                 question_id: i.question_id.map(|q| q.to_string()),
                 category: i.category.as_str().to_string(),
                 question: i.question.clone(),
                 response: i.response.map(|r| r.as_str().to_string()),
                 note: i.note.clone(),
                 photo: i.photo.clone(),
                 tags: to_json(&i.tags)? })
  }

  fn into_domain(self) -> Result<ChecklistItem, DomainError> {
    Ok(ChecklistItem { id: parse_id(&self.id)?,
                       audit_id: parse_id(&self.audit_id)?,
                       question_id: parse_opt_id(self.question_id)?,
                       category: parse_enum(&self.category)?,
                       question: self.question,
                       response: self.response.as_deref().map(parse_enum).transpose()?,
                       note: self.note,
                       photo: self.photo,
                       tags: from_json(&self.tags)? })
  }
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = actions, treat_none_as_null = true)]
struct ActionRow {
  id: String,
  title: String,
  description: Option<String>,
  audit_id: Option<String>,
  checklist_item_id: Option<String>,
  assignee_id: Option<String>,
  zone_id: Option<String>,
  priority: String,
  status: String,
  due_ts: Option<i64>,
  created_at_ts: i64,
  closed_at_ts: Option<i64>,
}

impl ActionRow {
  fn from_domain(a: &Action) -> Self {
    ActionRow { id: a.id.to_string(),
                title: a.title.clone(),
                description: a.description.clone(),
                audit_id: a.audit_id.map(|x| x.to_string()),
                checklist_item_id: a.checklist_item_id.map(|x| x.to_string()),
                assignee_id: a.assignee_id.map(|x| x.to_string()),
                zone_id: a.zone_id.map(|x| x.to_string()),
                priority: a.priority.as_str().to_string(),
                status: a.status.as_str().to_string(),
                due_ts: a.due_date.map(ts),
                created_at_ts: ts(a.created_at),
                closed_at_ts: a.closed_at.map(ts) }
  }

  fn into_domain(self) -> Result<Action, DomainError> {
    Ok(Action { id: parse_id(&self.id)?,
                title: self.title,
                description: self.description,
                audit_id: parse_opt_id(self.audit_id)?,
                checklist_item_id: parse_opt_id(self.checklist_item_id)?,
                assignee_id: parse_opt_id(self.assignee_id)?,
                zone_id: parse_opt_id(self.zone_id)?,
                priority: parse_enum(&self.priority)?,
                status: parse_enum(&self.status)?,
                due_date: from_opt_ts(self.due_ts)?,
                created_at: from_ts(self.created_at_ts)?,
                closed_at: from_opt_ts(self.closed_at_ts)? })
  }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = records)]
struct RecordRow {
  kind: String,
  id: String,
  payload: String,
  created_at_ts: i64,
}

fn collect<R, T>(rows: Vec<R>, f: impl Fn(R) -> Result<T, DomainError>) -> Result<Vec<T>, DomainError> {
  rows.into_iter().map(f).collect()
}

impl AuditRepository for DieselAuditRepository {
  fn save_user(&self, user: User) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let row = UserRow::from_domain(&user)?;
    map_db_err(diesel::insert_into(users::table).values(&row)
                                                .on_conflict(users::id)
                                                .do_update()
                                                .set(&row)
                                                .execute(&mut conn))?;
    Ok(user.id)
  }

  fn get_user(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(users::table.find(id.to_string()).first::<UserRow>(&mut conn).optional())?;
    row.map(UserRow::into_domain).transpose()
  }

  fn find_user_by_api_key_hash(&self, hash: &str) -> Result<Option<User>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(users::table.filter(users::api_key_hash.eq(hash)).first::<UserRow>(&mut conn).optional())?;
    row.map(UserRow::into_domain).transpose()
  }

  fn list_users(&self) -> Result<Vec<User>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(users::table.order((users::created_at_ts.asc(), users::id.asc())).load::<UserRow>(&mut conn))?;
    collect(rows, UserRow::into_domain)
  }

  fn save_zone(&self, zone: Zone) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let row = ZoneRow::from_domain(&zone);
    map_db_err(diesel::insert_into(zones::table).values(&row)
                                                .on_conflict(zones::id)
                                                .do_update()
                                                .set(&row)
                                                .execute(&mut conn))?;
    Ok(zone.id)
  }

  fn get_zone(&self, id: &Uuid) -> Result<Option<Zone>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(zones::table.find(id.to_string()).first::<ZoneRow>(&mut conn).optional())?;
    row.map(ZoneRow::into_domain).transpose()
  }

  fn list_zones(&self) -> Result<Vec<Zone>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(zones::table.order((zones::created_at_ts.asc(), zones::id.asc())).load::<ZoneRow>(&mut conn))?;
    collect(rows, ZoneRow::into_domain)
  }

  fn delete_zone(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let deleted = conn.transaction::<_, TxError, _>(|conn| {
                        let in_audits: i64 = audits::table.filter(audits::zone_id.eq(&id_s)).count().get_result(conn)?;
                        let in_actions: i64 = actions::table.filter(actions::zone_id.eq(&id_s)).count().get_result(conn)?;
                        if in_audits + in_actions > 0 {
                          return Err(TxError::Domain(DomainError::validation(format!("la zona {} tiene auditorías o \
                                                                                      acciones asociadas",
                                                                                     id))));
                        }
                        Ok(diesel::delete(zones::table.find(&id_s)).execute(conn)?)
                      })?;
    Ok(deleted > 0)
  }

  fn save_team(&self, team: Team) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let row = TeamRow::from_domain(&team)?;
    map_db_err(diesel::insert_into(teams::table).values(&row)
                                                .on_conflict(teams::id)
                                                .do_update()
                                                .set(&row)
                                                .execute(&mut conn))?;
    Ok(team.id)
  }

  fn get_team(&self, id: &Uuid) -> Result<Option<Team>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(teams::table.find(id.to_string()).first::<TeamRow>(&mut conn).optional())?;
    row.map(TeamRow::into_domain).transpose()
  }

  fn list_teams(&self) -> Result<Vec<Team>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(teams::table.order((teams::created_at_ts.asc(), teams::id.asc())).load::<TeamRow>(&mut conn))?;
    collect(rows, TeamRow::into_domain)
  }

  fn delete_team(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::delete(teams::table.find(id.to_string())).execute(&mut conn))?;
    Ok(n > 0)
  }

  fn create_audit_with_items(&self, audit: Audit, items: Vec<ChecklistItem>) -> Result<Uuid, DomainError> {
    if items.iter().any(|i| i.audit_id != audit.id) {
      return Err(DomainError::validation("todos los ítems deben pertenecer a la auditoría creada"));
    }
    let audit_row = AuditRow::from_domain(&audit);
    let item_rows = items.iter()
                         .enumerate()
                         .map(|(pos, i)| ItemRow::from_domain(i, pos as i64))
                         .collect::<Result<Vec<_>, _>>()?;
    let mut conn = self.conn()?;
    conn.transaction::<_, TxError, _>(|conn| {
          diesel::insert_into(audits::table).values(&audit_row).execute(conn)?;
          for row in &item_rows {
            diesel::insert_into(checklist_items::table).values(row).execute(conn)?;
          }
          Ok(())
        })?;
    log::debug!("auditoría {} creada con {} ítems", audit.id, item_rows.len());
    Ok(audit.id)
  }

  fn update_audit(&self, audit: Audit) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let row = AuditRow::from_domain(&audit);
    let n = map_db_err(diesel::update(audits::table.find(&row.id)).set(&row).execute(&mut conn))?;
    if n == 0 {
      return Err(DomainError::not_found("auditoría", audit.id));
    }
    Ok(())
  }

  fn get_audit(&self, id: &Uuid) -> Result<Option<Audit>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(audits::table.find(id.to_string()).first::<AuditRow>(&mut conn).optional())?;
    row.map(AuditRow::into_domain).transpose()
  }

  fn list_audits(&self) -> Result<Vec<Audit>, DomainError> {
    let mut conn = self.conn()?;
    let rows =
      map_db_err(audits::table.order((audits::created_at_ts.asc(), audits::id.asc())).load::<AuditRow>(&mut conn))?;
    collect(rows, AuditRow::into_domain)
  }

  fn list_audits_for_zone(&self, zone_id: &Uuid) -> Result<Vec<Audit>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(audits::table.filter(audits::zone_id.eq(zone_id.to_string()))
                                       .order((audits::created_at_ts.asc(), audits::id.asc()))
                                       .load::<AuditRow>(&mut conn))?;
    collect(rows, AuditRow::into_domain)
  }

  fn delete_audit(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let deleted = conn.transaction::<_, TxError, _>(|conn| {
                        diesel::delete(checklist_items::table.filter(checklist_items::audit_id.eq(&id_s))).execute(conn)?;
                        diesel::update(actions::table.filter(actions::audit_id.eq(&id_s)))
                          .set((actions::audit_id.eq(None::<String>), actions::checklist_item_id.eq(None::<String>)))
                          .execute(conn)?;
                        Ok(diesel::delete(audits::table.find(&id_s)).execute(conn)?)
                      })?;
    Ok(deleted > 0)
  }

  fn list_checklist_items(&self, audit_id: &Uuid) -> Result<Vec<ChecklistItem>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(checklist_items::table.filter(checklist_items::audit_id.eq(audit_id.to_string()))
                                                .order(checklist_items::position.asc())
                                                .load::<ItemRow>(&mut conn))?;
    collect(rows, ItemRow::into_domain)
  }

  fn get_checklist_item(&self, id: &Uuid) -> Result<Option<ChecklistItem>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(checklist_items::table.find(id.to_string()).first::<ItemRow>(&mut conn).optional())?;
    row.map(ItemRow::into_domain).transpose()
  }

  fn update_checklist_item(&self, item: ChecklistItem) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    // La posición y la auditoría de un ítem no cambian.
    let ItemRow { id, question_id, category, question, response, note, photo, tags, .. } = ItemRow::from_domain(&item, 0)?;
    let n = map_db_err(diesel::update(checklist_items::table.find(id)).set((checklist_items::question_id.eq(question_id),
                                                                           checklist_items::category.eq(category),
                                                                           checklist_items::question.eq(question),
                                                                           checklist_items::response.eq(response),
                                                                           checklist_items::note.eq(note),
                                                                           checklist_items::photo.eq(photo),
                                                                           checklist_items::tags.eq(tags)))
                                                                     .execute(&mut conn))?;
    if n == 0 {
      return Err(DomainError::not_found("ítem de checklist", item.id));
    }
    Ok(())
  }

  fn save_action(&self, action: Action) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let row = ActionRow::from_domain(&action);
    map_db_err(diesel::insert_into(actions::table).values(&row)
                                                  .on_conflict(actions::id)
                                                  .do_update()
                                                  .set(&row)
                                                  .execute(&mut conn))?;
    Ok(action.id)
  }

  fn get_action(&self, id: &Uuid) -> Result<Option<Action>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(actions::table.find(id.to_string()).first::<ActionRow>(&mut conn).optional())?;
    row.map(ActionRow::into_domain).transpose()
  }

  fn list_actions(&self) -> Result<Vec<Action>, DomainError> {
    let mut conn = self.conn()?;
    let rows =
      map_db_err(actions::table.order((actions::created_at_ts.asc(), actions::id.asc())).load::<ActionRow>(&mut conn))?;
    collect(rows, ActionRow::into_domain)
  }

  fn list_actions_for_assignee(&self, assignee_id: &Uuid) -> Result<Vec<Action>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(actions::table.filter(actions::assignee_id.eq(assignee_id.to_string()))
                                        .order((actions::created_at_ts.asc(), actions::id.asc()))
                                        .load::<ActionRow>(&mut conn))?;
    collect(rows, ActionRow::into_domain)
  }

  fn delete_action(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::delete(actions::table.find(id.to_string())).execute(&mut conn))?;
    Ok(n > 0)
  }

  fn save_record(&self, kind: RecordKind, id: Uuid, payload: JsonValue) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let row = RecordRow { kind: kind.as_str().to_string(),
                          id: id.to_string(),
                          payload: payload.to_string(),
                          created_at_ts: ts(Utc::now()) };
    map_db_err(diesel::insert_into(records::table).values(&row)
                                                  .on_conflict((records::kind, records::id))
                                                  .do_update()
                                                  .set(records::payload.eq(&row.payload))
                                                  .execute(&mut conn))?;
    Ok(())
  }

  fn get_record(&self, kind: RecordKind, id: &Uuid) -> Result<Option<JsonValue>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(records::table.find((kind.as_str(), id.to_string())).first::<RecordRow>(&mut conn).optional())?;
    row.map(|r| from_json(&r.payload)).transpose()
  }

  fn list_records(&self, kind: RecordKind) -> Result<Vec<JsonValue>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(records::table.filter(records::kind.eq(kind.as_str()))
                                        .order((records::created_at_ts.asc(), records::id.asc()))
                                        .load::<RecordRow>(&mut conn))?;
    collect(rows, |r| from_json(&r.payload))
  }

  fn delete_record(&self, kind: RecordKind, id: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::delete(records::table.find((kind.as_str(), id.to_string()))).execute(&mut conn))?;
    Ok(n > 0)
  }
}
