// reports.rs
use fives_domain::{Audit, ChecklistItem, ChecklistResponse, Pillar, User, Zone};
use indexmap::IndexMap;
use std::fmt::Write;

/// Nombre de fichero del informe descargable.
pub fn report_filename(audit: &Audit) -> String {
  format!("audit-{}.txt", audit.id)
}

#[derive(Default)]
struct PillarTally {
  pass: usize,
  fail: usize,
  not_applicable: usize,
  pending: usize,
}

/// Informe de texto plano de una auditoría: cabecera, estado y puntuación,
/// una sección por pilar en orden 5S y las notas.
pub fn render_audit_report(audit: &Audit, zone: Option<&Zone>, auditor: Option<&User>, items: &[ChecklistItem]) -> String {
  let mut out = String::new();
  // write! sobre String no falla
  let _ = writeln!(out, "5S AUDIT REPORT");
  let _ = writeln!(out, "===============");
  let _ = writeln!(out, "Title:     {}", audit.title);
  match zone {
    Some(z) => {
      let location: Vec<&str> = [z.building.as_deref(), z.floor.as_deref()].into_iter().flatten().collect();
      if location.is_empty() {
        let _ = writeln!(out, "Zone:      {}", z.name);
      } else {
        let _ = writeln!(out, "Zone:      {} ({})", z.name, location.join(", "));
      }
    }
    None => {
      let _ = writeln!(out, "Zone:      {}", audit.zone_id);
    }
  }
  if let Some(u) = auditor {
    let _ = writeln!(out, "Auditor:   {}", u.display_name.as_deref().unwrap_or(&u.username));
  }
  let _ = writeln!(out, "Scheduled: {}", audit.scheduled_date.format("%Y-%m-%d %H:%M UTC"));
  let _ = writeln!(out, "Status:    {}", audit.status);
  if let Some(done) = audit.completed_at {
    let _ = writeln!(out, "Completed: {}", done.format("%Y-%m-%d %H:%M UTC"));
  }
  match audit.overall_score {
    Some(score) => {
      let _ = writeln!(out, "Score:     {}/100", score);
    }
    None => {
      let _ = writeln!(out, "Score:     -");
    }
  }

  let mut groups: IndexMap<Pillar, Vec<&ChecklistItem>> = Pillar::ALL.iter().map(|p| (*p, Vec::new())).collect();
  for item in items {
    if let Some(list) = groups.get_mut(&item.category) {
      list.push(item);
    }
  }
  for (pillar, list) in groups.iter().filter(|(_, l)| !l.is_empty()) {
    let mut tally = PillarTally::default();
    for item in list {
      match item.response {
        Some(ChecklistResponse::Pass) => tally.pass += 1,
        Some(ChecklistResponse::Fail) => tally.fail += 1,
        Some(ChecklistResponse::NotApplicable) => tally.not_applicable += 1,
        None => tally.pending += 1,
      }
    }
    let _ = writeln!(out);
    let _ = writeln!(out,
                     "{} | pass {} | fail {} | N/A {} | pending {}",
                     pillar.label(),
                     tally.pass,
                     tally.fail,
                     tally.not_applicable,
                     tally.pending);
    for item in list {
      let mark = item.response.map(|r| r.symbol()).unwrap_or(" ");
      let _ = writeln!(out, "  [{}] {}", mark, item.question);
      if let Some(note) = &item.note {
        let _ = writeln!(out, "      Note: {}", note);
      }
      if !item.tags.is_empty() {
        let _ = writeln!(out, "      Tags: {}", item.tags.join(", "));
      }
    }
  }

  if let Some(notes) = &audit.notes {
    let _ = writeln!(out);
    let _ = writeln!(out, "Notes:");
    let _ = writeln!(out, "{}", notes);
  }
  out
}
