// dashboard.rs
use crate::InsightsError;
use chrono::{DateTime, Utc};
use fives_cache::{Clock, TtlCache};
use fives_domain::{day_window, Action, ActionStatus, Audit, AuditRepository, User};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Clave de la cache bajo la que vive el agregado.
pub const STATS_KEY: &str = "dashboard_stats";

/// Agregado del panel principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub total_audits: usize,
  pub completed_audits: usize,
  pub todays_audits: usize,
  pub pending_actions: usize,
  pub overdue_actions: usize,
  pub compliance_rate: u8,
  pub active_users: usize,
  pub total_teams: usize,
}

/// Calcula el agregado sin efectos laterales.
///
/// `todays_audits` usa el día UTC de `now`; `pending_actions` cuenta las
/// acciones `open`; `compliance_rate` es 0 si no hay auditorías.
pub fn compute_stats(audits: &[Audit], actions: &[Action], users: &[User], total_teams: usize, now: DateTime<Utc>)
                     -> DashboardStats {
  let (today_start, today_end) = day_window(now);
  let total_audits = audits.len();
  let completed_audits = audits.par_iter().filter(|a| a.is_completed()).count();
  let todays_audits = audits.par_iter()
                            .filter(|a| a.scheduled_date >= today_start && a.scheduled_date < today_end)
                            .count();
  let pending_actions = actions.par_iter().filter(|a| a.status == ActionStatus::Open).count();
  let overdue_actions = actions.par_iter().filter(|a| a.is_overdue(now)).count();
  let active_users = users.par_iter().filter(|u| u.is_active).count();
  let compliance_rate = if total_audits == 0 {
    0
  } else {
    ((completed_audits as f64 / total_audits as f64) * 100.0).round() as u8
  };
  DashboardStats { total_audits,
                   completed_audits,
                   todays_audits,
                   pending_actions,
                   overdue_actions,
                   compliance_rate,
                   active_users,
                   total_teams }
}

/// Valores que guarda la cache del dashboard.
#[derive(Debug, Clone)]
pub enum CachedView {
  Stats(DashboardStats),
  Audits(Arc<Vec<Audit>>),
  Actions(Arc<Vec<Action>>),
}

pub fn zone_audits_key(zone_id: &Uuid) -> String {
  format!("audits_zone_{}", zone_id)
}

pub fn assignee_actions_key(assignee_id: &Uuid) -> String {
  format!("actions_assignee_{}", assignee_id)
}

/// Lecturas cacheadas del dashboard y hooks de invalidación para las rutas
/// de escritura.
///
/// Cada familia de claves lleva una generación que los hooks incrementan
/// antes de invalidar. Un valor leído del repositorio sólo se queda en la
/// cache si su generación no cambió mientras se calculaba.
pub struct DashboardService {
  repo: Arc<dyn AuditRepository>,
  cache: TtlCache<CachedView>,
  clock: Arc<dyn Clock>,
  lookup_ttl: Duration,
  stats_generation: AtomicU64,
  zones_generation: AtomicU64,
  assignees_generation: AtomicU64,
}

impl DashboardService {
  pub fn new(repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>, stats_ttl: Duration, lookup_ttl: Duration) -> Self {
    let cache = TtlCache::new(stats_ttl, clock.clone());
    Self { repo,
           cache,
           clock,
           lookup_ttl,
           stats_generation: AtomicU64::new(0),
           zones_generation: AtomicU64::new(0),
           assignees_generation: AtomicU64::new(0) }
  }

  /// Guarda `value` salvo que la familia se haya invalidado desde `seen`.
  /// La segunda comprobación cubre una invalidación que llegue entre la
  /// primera y el `set`.
  fn store(&self, key: &str, value: CachedView, ttl: Duration, generation: &AtomicU64, seen: u64) {
    if generation.load(Ordering::SeqCst) != seen {
      debug!(key, "dashboard: invalidado durante el cálculo, no se cachea");
      return;
    }
    self.cache.set_with_ttl(key, value, ttl);
    if generation.load(Ordering::SeqCst) != seen {
      self.cache.invalidate(key);
    }
  }

  pub fn cache(&self) -> &TtlCache<CachedView> {
    &self.cache
  }

  /// Agregado del dashboard; se recalcula como mucho una vez por TTL salvo
  /// invalidación.
  pub fn stats(&self) -> Result<DashboardStats, InsightsError> {
    if let Some(CachedView::Stats(stats)) = self.cache.get(STATS_KEY) {
      debug!("dashboard: cache hit");
      return Ok(stats);
    }
    let seen = self.stats_generation.load(Ordering::SeqCst);
    let audits = self.repo.list_audits()?;
    let actions = self.repo.list_actions()?;
    let users = self.repo.list_users()?;
    let total_teams = self.repo.list_teams()?.len();
    let stats = compute_stats(&audits, &actions, &users, total_teams, self.clock.now());
    debug!(total_audits = stats.total_audits, "dashboard: recalculado");
    self.store(STATS_KEY,
               CachedView::Stats(stats.clone()),
               self.cache.default_ttl(),
               &self.stats_generation,
               seen);
    Ok(stats)
  }

  pub fn audits_for_zone(&self, zone_id: &Uuid) -> Result<Arc<Vec<Audit>>, InsightsError> {
    let key = zone_audits_key(zone_id);
    if let Some(CachedView::Audits(list)) = self.cache.get(&key) {
      return Ok(list);
    }
    let seen = self.zones_generation.load(Ordering::SeqCst);
    let list = Arc::new(self.repo.list_audits_for_zone(zone_id)?);
    self.store(&key, CachedView::Audits(list.clone()), self.lookup_ttl, &self.zones_generation, seen);
    Ok(list)
  }

  pub fn actions_for_assignee(&self, assignee_id: &Uuid) -> Result<Arc<Vec<Action>>, InsightsError> {
    let key = assignee_actions_key(assignee_id);
    if let Some(CachedView::Actions(list)) = self.cache.get(&key) {
      return Ok(list);
    }
    let seen = self.assignees_generation.load(Ordering::SeqCst);
    let list = Arc::new(self.repo.list_actions_for_assignee(assignee_id)?);
    self.store(&key, CachedView::Actions(list.clone()), self.lookup_ttl, &self.assignees_generation, seen);
    Ok(list)
  }

  /// Tras escribir auditorías: agregado y listados de las zonas tocadas.
  pub fn audits_changed(&self, zone_ids: &[Uuid]) {
    self.stats_generation.fetch_add(1, Ordering::SeqCst);
    self.zones_generation.fetch_add(1, Ordering::SeqCst);
    self.cache.invalidate(STATS_KEY);
    for zone in zone_ids {
      self.cache.invalidate_pattern(&format!("zone_{}", zone));
    }
  }

  /// Tras escribir acciones: agregado y listados de los responsables tocados.
  pub fn actions_changed(&self, assignee_ids: &[Uuid]) {
    self.stats_generation.fetch_add(1, Ordering::SeqCst);
    self.assignees_generation.fetch_add(1, Ordering::SeqCst);
    self.cache.invalidate(STATS_KEY);
    for assignee in assignee_ids {
      self.cache.invalidate(&assignee_actions_key(assignee));
    }
  }

  /// Usuarios o equipos: sólo cambia el agregado.
  pub fn directory_changed(&self) {
    self.stats_generation.fetch_add(1, Ordering::SeqCst);
    self.cache.invalidate(STATS_KEY);
  }
}
