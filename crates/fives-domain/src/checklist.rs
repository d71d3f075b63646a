// checklist.rs
use crate::patch::{apply, clean, double_option};
use crate::DomainError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tamaño máximo de una foto adjunta, ya decodificada.
pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

/// Los cinco pilares 5S, en su orden canónico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
  Sort,
  SetInOrder,
  Shine,
  Standardize,
  Sustain,
}

impl Pillar {
  pub const ALL: [Pillar; 5] = [Pillar::Sort, Pillar::SetInOrder, Pillar::Shine, Pillar::Standardize, Pillar::Sustain];

  pub fn as_str(&self) -> &'static str {
    match self {
      Pillar::Sort => "sort",
      Pillar::SetInOrder => "set_in_order",
      Pillar::Shine => "shine",
      Pillar::Standardize => "standardize",
      Pillar::Sustain => "sustain",
    }
  }

  /// Nombre legible (para informes).
  pub fn label(&self) -> &'static str {
    match self {
      Pillar::Sort => "Sort (Seiri)",
      Pillar::SetInOrder => "Set in Order (Seiton)",
      Pillar::Shine => "Shine (Seiso)",
      Pillar::Standardize => "Standardize (Seiketsu)",
      Pillar::Sustain => "Sustain (Shitsuke)",
    }
  }
}

impl fmt::Display for Pillar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Pillar {
  type Err = DomainError;

  /// Acepta el valor canónico y variantes habituales ("set-in-order",
  /// "Set in Order", "seiri"...).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let norm: String = s.trim().to_lowercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
    match norm.as_str() {
      "sort" | "seiri" => Ok(Pillar::Sort),
      "setinorder" | "seiton" | "set" => Ok(Pillar::SetInOrder),
      "shine" | "seiso" => Ok(Pillar::Shine),
      "standardize" | "standardise" | "seiketsu" => Ok(Pillar::Standardize),
      "sustain" | "shitsuke" => Ok(Pillar::Sustain),
      _ => Err(DomainError::validation(format!("categoría 5S desconocida: {}", s))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistResponse {
  Pass,
  Fail,
  NotApplicable,
}

impl ChecklistResponse {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChecklistResponse::Pass => "pass",
      ChecklistResponse::Fail => "fail",
      ChecklistResponse::NotApplicable => "not_applicable",
    }
  }

  /// Símbolo corto usado en el informe de texto.
  pub fn symbol(&self) -> &'static str {
    match self {
      ChecklistResponse::Pass => "✓",
      ChecklistResponse::Fail => "✗",
      ChecklistResponse::NotApplicable => "N/A",
    }
  }
}

impl FromStr for ChecklistResponse {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pass" => Ok(ChecklistResponse::Pass),
      "fail" => Ok(ChecklistResponse::Fail),
      "not_applicable" => Ok(ChecklistResponse::NotApplicable),
      other => Err(DomainError::validation(format!("respuesta desconocida: {}", other))),
    }
  }
}

/// Pregunta-respuesta dentro de una auditoría.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
  pub id: Uuid,
  pub audit_id: Uuid,
  pub question_id: Option<Uuid>,
  pub category: Pillar,
  pub question: String,
  pub response: Option<ChecklistResponse>,
  pub note: Option<String>,
  pub photo: Option<String>,
  pub tags: Vec<String>,
}

fn validate_photo(photo: &Option<String>) -> Result<(), DomainError> {
  let Some(p) = photo else { return Ok(()) };
  // Se admite tanto base64 plano como data URL.
  let payload = match p.split_once(";base64,") {
    Some((prefix, data)) if prefix.starts_with("data:") => data,
    _ => p.as_str(),
  };
  let bytes = STANDARD.decode(payload.trim())
                      .map_err(|e| DomainError::validation(format!("foto no es base64 válido: {}", e)))?;
  if bytes.len() > MAX_PHOTO_BYTES {
    return Err(DomainError::validation(format!("la foto supera {} bytes", MAX_PHOTO_BYTES)));
  }
  Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for t in tags {
    let t = t.trim().to_lowercase();
    if !t.is_empty() && !out.contains(&t) {
      out.push(t);
    }
  }
  out
}

/// Ítem a crear junto con una auditoría.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewChecklistItem {
  #[serde(default)]
  pub question_id: Option<Uuid>,
  pub category: Pillar,
  pub question: String,
  #[serde(default)]
  pub response: Option<ChecklistResponse>,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default)]
  pub photo: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
}

impl NewChecklistItem {
  pub fn into_item(self, audit_id: Uuid) -> Result<ChecklistItem, DomainError> {
    let question = self.question.trim().to_string();
    if question.is_empty() {
      return Err(DomainError::validation("el texto de la pregunta no puede estar vacío"));
    }
    validate_photo(&self.photo)?;
    Ok(ChecklistItem { id: Uuid::new_v4(),
                       audit_id,
                       question_id: self.question_id,
                       category: self.category,
                       question,
                       response: self.response,
                       note: clean(self.note),
                       photo: self.photo,
                       tags: clean_tags(self.tags) })
  }
}

/// Respuesta de un auditor sobre un ítem existente.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChecklistAnswer {
  #[serde(default, deserialize_with = "double_option")]
  pub response: Option<Option<ChecklistResponse>>,
  #[serde(default, deserialize_with = "double_option")]
  pub note: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub photo: Option<Option<String>>,
  #[serde(default)]
  pub tags: Option<Vec<String>>,
}

impl ChecklistAnswer {
  pub fn apply(self, item: &mut ChecklistItem) -> Result<(), DomainError> {
    if let Some(photo) = &self.photo {
      validate_photo(photo)?;
    }
    apply(&mut item.response, self.response);
    apply(&mut item.note, self.note.map(clean));
    apply(&mut item.photo, self.photo);
    if let Some(tags) = self.tags {
      item.tags = clean_tags(tags);
    }
    Ok(())
  }
}

/// Puntuación 0..=100 de un conjunto de ítems: aprobados / (aprobados +
/// fallidos). Los N/A y los ítems sin responder no cuentan; si no queda
/// nada evaluado la puntuación es 100.
pub fn checklist_score(items: &[ChecklistItem]) -> u8 {
  let (pass, fail) = items.iter().fold((0u32, 0u32), |(p, f), i| match i.response {
                                   Some(ChecklistResponse::Pass) => (p + 1, f),
                                   Some(ChecklistResponse::Fail) => (p, f + 1),
                                   _ => (p, f),
                                 });
  if pass + fail == 0 {
    return 100;
  }
  ((pass as f64 / (pass + fail) as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(response: Option<ChecklistResponse>) -> ChecklistItem {
    ChecklistItem { id: Uuid::new_v4(),
                    audit_id: Uuid::nil(),
                    question_id: None,
                    category: Pillar::Shine,
                    question: "¿Suelo limpio?".into(),
                    response,
                    note: None,
                    photo: None,
                    tags: vec![] }
  }

  #[test]
  fn score_ignores_not_applicable_and_unanswered() {
    use ChecklistResponse::*;
    let items = vec![item(Some(Pass)), item(Some(Pass)), item(Some(Fail)), item(Some(NotApplicable)), item(None)];
    assert_eq!(checklist_score(&items), 67);
    assert_eq!(checklist_score(&[item(Some(NotApplicable))]), 100);
    assert_eq!(checklist_score(&[]), 100);
    assert_eq!(checklist_score(&[item(Some(Fail))]), 0);
  }

  #[test]
  fn pillar_parses_common_spellings() {
    assert_eq!("Set in Order".parse::<Pillar>().unwrap(), Pillar::SetInOrder);
    assert_eq!("set-in-order".parse::<Pillar>().unwrap(), Pillar::SetInOrder);
    assert_eq!("Seiketsu".parse::<Pillar>().unwrap(), Pillar::Standardize);
    assert!("cleanliness".parse::<Pillar>().is_err());
  }

  #[test]
  fn photo_must_be_base64() {
    let mut it = item(None);
    let bad = ChecklistAnswer { photo: Some(Some("not base64!!".into())), ..Default::default() };
    assert!(bad.apply(&mut it).is_err());
    let good = ChecklistAnswer { photo: Some(Some("data:image/png;base64,aGVsbG8=".into())), ..Default::default() };
    good.apply(&mut it).unwrap();
    assert!(it.photo.is_some());
  }

  #[test]
  fn tags_are_normalized() {
    let mut it = item(None);
    ChecklistAnswer { tags: Some(vec![" Seguridad ".into(), "seguridad".into(), "".into()]), ..Default::default() }
      .apply(&mut it)
      .unwrap();
    assert_eq!(it.tags, vec!["seguridad".to_string()]);
  }
}
