// schedule.rs
use crate::record::{Drafted, Record, RecordKind};
use crate::DomainError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
  Daily,
  Weekly,
  Monthly,
}

/// Plantilla de auditoría recurrente. `next_run` se recalcula en cada
/// alta/edición.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
  pub id: Uuid,
  pub name: String,
  pub zone_id: Uuid,
  pub team_id: Option<Uuid>,
  pub frequency: Frequency,
  /// 0 = lunes .. 6 = domingo (sólo `weekly`).
  pub day_of_week: Option<u8>,
  /// 1..=28 (sólo `monthly`).
  pub day_of_month: Option<u8>,
  /// "HH:MM" en UTC.
  pub time_of_day: String,
  pub is_active: bool,
  pub next_run: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduleDraft {
  pub name: String,
  pub zone_id: Uuid,
  #[serde(default)]
  pub team_id: Option<Uuid>,
  pub frequency: Frequency,
  #[serde(default)]
  pub day_of_week: Option<u8>,
  #[serde(default)]
  pub day_of_month: Option<u8>,
  pub time_of_day: String,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

fn parse_time(s: &str) -> Result<NaiveTime, DomainError> {
  NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| DomainError::validation(format!("timeOfDay inválido (HH:MM): {}", s)))
}

impl ScheduleDraft {
  fn validate(&self) -> Result<NaiveTime, DomainError> {
    if self.name.trim().is_empty() {
      return Err(DomainError::validation("el nombre de la programación no puede estar vacío"));
    }
    match self.frequency {
      Frequency::Weekly => match self.day_of_week {
        Some(d) if d <= 6 => {}
        _ => return Err(DomainError::validation("weekly requiere dayOfWeek en 0..=6")),
      },
      Frequency::Monthly => match self.day_of_month {
        Some(d) if (1..=28).contains(&d) => {}
        _ => return Err(DomainError::validation("monthly requiere dayOfMonth en 1..=28")),
      },
      Frequency::Daily => {}
    }
    parse_time(&self.time_of_day)
  }
}

impl Schedule {
  /// Primera ejecución estrictamente posterior a `now`; `None` si está
  /// inactiva o la configuración es inconsistente.
  pub fn next_run_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !self.is_active {
      return None;
    }
    let time = parse_time(&self.time_of_day).ok()?;
    let today = now.date_naive();
    let at = |d: NaiveDate| d.and_time(time).and_utc();
    match self.frequency {
      Frequency::Daily => {
        let c = at(today);
        Some(if c > now { c } else { c + Duration::days(1) })
      }
      Frequency::Weekly => {
        let target = i64::from(self.day_of_week?);
        let current = i64::from(today.weekday().num_days_from_monday());
        let c = at(today + Duration::days((target - current).rem_euclid(7)));
        Some(if c > now { c } else { c + Duration::days(7) })
      }
      Frequency::Monthly => {
        let dom = u32::from(self.day_of_month?);
        let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), dom)?;
        let c = at(this_month);
        if c > now {
          return Some(c);
        }
        let (y, m) = if today.month() == 12 { (today.year() + 1, 1) } else { (today.year(), today.month() + 1) };
        NaiveDate::from_ymd_opt(y, m, dom).map(at)
      }
    }
  }
}

impl Record for Schedule {
  const KIND: RecordKind = RecordKind::Schedule;

  fn id(&self) -> Uuid {
    self.id
  }

  fn referenced_zones(&self) -> Vec<Uuid> {
    vec![self.zone_id]
  }

  fn referenced_teams(&self) -> Vec<Uuid> {
    self.team_id.into_iter().collect()
  }
}

impl Drafted for Schedule {
  type Draft = ScheduleDraft;

  fn from_draft(draft: ScheduleDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
    let mut s = Schedule { id: Uuid::new_v4(),
                           name: String::new(),
                           zone_id: draft.zone_id,
                           team_id: None,
                           frequency: draft.frequency,
                           day_of_week: None,
                           day_of_month: None,
                           time_of_day: String::new(),
                           is_active: true,
                           next_run: None,
                           created_at: now };
    s.apply_draft(draft, now)?;
    Ok(s)
  }

  fn apply_draft(&mut self, draft: ScheduleDraft, now: DateTime<Utc>) -> Result<(), DomainError> {
    let time = draft.validate()?;
    self.name = draft.name.trim().to_string();
    self.zone_id = draft.zone_id;
    self.team_id = draft.team_id;
    self.frequency = draft.frequency;
    self.day_of_week = if draft.frequency == Frequency::Weekly { draft.day_of_week } else { None };
    self.day_of_month = if draft.frequency == Frequency::Monthly { draft.day_of_month } else { None };
    self.time_of_day = time.format("%H:%M").to_string();
    self.is_active = draft.is_active;
    self.next_run = self.next_run_after(now);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn schedule(freq: Frequency, dow: Option<u8>, dom: Option<u8>, time: &str, now: DateTime<Utc>) -> Schedule {
    Schedule::from_draft(ScheduleDraft { name: "Ronda".into(),
                                         zone_id: Uuid::new_v4(),
                                         team_id: None,
                                         frequency: freq,
                                         day_of_week: dow,
                                         day_of_month: dom,
                                         time_of_day: time.into(),
                                         is_active: true },
                         now).unwrap()
  }

  #[test]
  fn daily_rolls_to_tomorrow_once_time_passed() {
    // 2024-01-15 es lunes.
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    let s = schedule(Frequency::Daily, None, None, "09:00", now);
    assert_eq!(s.next_run, Some(Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap()));
    let s = schedule(Frequency::Daily, None, None, "11:30", now);
    assert_eq!(s.next_run, Some(Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 0).unwrap()));
  }

  #[test]
  fn weekly_targets_requested_weekday() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    // Miércoles
    let s = schedule(Frequency::Weekly, Some(2), None, "08:00", now);
    assert_eq!(s.next_run, Some(Utc.with_ymd_and_hms(2024, 1, 17, 8, 0, 0).unwrap()));
    // Lunes a una hora ya pasada -> lunes siguiente
    let s = schedule(Frequency::Weekly, Some(0), None, "08:00", now);
    assert_eq!(s.next_run, Some(Utc.with_ymd_and_hms(2024, 1, 22, 8, 0, 0).unwrap()));
  }

  #[test]
  fn monthly_wraps_year() {
    let now = Utc.with_ymd_and_hms(2024, 12, 20, 10, 0, 0).unwrap();
    let s = schedule(Frequency::Monthly, None, Some(5), "07:15", now);
    assert_eq!(s.next_run, Some(Utc.with_ymd_and_hms(2025, 1, 5, 7, 15, 0).unwrap()));
  }

  #[test]
  fn invalid_configuration_is_rejected() {
    let now = Utc::now();
    let draft = ScheduleDraft { name: "x".into(),
                                zone_id: Uuid::new_v4(),
                                team_id: None,
                                frequency: Frequency::Monthly,
                                day_of_week: None,
                                day_of_month: Some(31),
                                time_of_day: "07:00".into(),
                                is_active: true };
    assert!(Schedule::from_draft(draft.clone(), now).is_err());
    let draft = ScheduleDraft { frequency: Frequency::Daily, time_of_day: "25:00".into(), ..draft };
    assert!(Schedule::from_draft(draft, now).is_err());
  }

  #[test]
  fn inactive_schedule_has_no_next_run() {
    let now = Utc::now();
    let mut s = schedule(Frequency::Daily, None, None, "09:00", now);
    s.is_active = false;
    assert_eq!(s.next_run_after(now), None);
  }
}
