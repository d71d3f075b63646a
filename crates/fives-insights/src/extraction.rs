// extraction.rs
use crate::InsightsError;
use async_trait::async_trait;
use flate2::read::ZlibDecoder;
use fives_domain::{DomainError, Pillar, QuestionDraft};
use lopdf::{Document, Object, Stream};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::{self, Read};
use tracing::{debug, warn};

/// Límite de caracteres que se envían al modelo.
const MAX_PROMPT_CHARS: usize = 12_000;

static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
  let categories: Vec<&str> = Pillar::ALL.iter().map(|p| p.as_str()).collect();
  format!("You extract 5S workplace audit checklist questions from documents. \
           Answer ONLY with a JSON array of objects {{\"category\": <one of {}>, \"text\": <question>}}. \
           Keep the original wording and language of each question.",
          categories.join(", "))
});

/// Pregunta propuesta a partir de un documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuestion {
  pub category: Pillar,
  pub text: String,
}

impl ExtractedQuestion {
  /// Borrador listo para dar de alta como pregunta activa de todas las zonas.
  pub fn into_draft(self, sort_order: i32) -> QuestionDraft {
    QuestionDraft { category: self.category,
                    text: self.text,
                    description: None,
                    zone_ids: Vec::new(),
                    is_active: true,
                    sort_order }
  }
}

// ---------------------------------------------------------------------------
// Texto de PDF
// ---------------------------------------------------------------------------

/// Tope de bytes descomprimidos de los streams de contenido de un documento.
const MAX_INFLATED_BYTES: u64 = 32 * 1024 * 1024;

fn is_flate(stream: &Stream) -> bool {
  match stream.dict.get(b"Filter") {
    Ok(Object::Name(name)) => name.as_slice() == b"FlateDecode",
    Ok(Object::Array(filters)) => filters.iter()
                                         .any(|f| matches!(f, Object::Name(name) if name.as_slice() == b"FlateDecode")),
    _ => false,
  }
}

/// Descuenta del presupuesto lo que ocupa el stream una vez inflado, sin
/// llegar a guardarlo en memoria.
fn charge_inflated(stream: &Stream, budget: u64) -> Result<u64, InsightsError> {
  if !is_flate(stream) {
    return Ok(budget.saturating_sub(stream.content.len() as u64));
  }
  let mut decoder = ZlibDecoder::new(stream.content.as_slice()).take(budget + 1);
  let inflated = io::copy(&mut decoder, &mut io::sink())
    .map_err(|e| InsightsError::Extraction(format!("stream FlateDecode ilegible: {}", e)))?;
  if inflated > budget {
    return Err(InsightsError::Extraction("el contenido descomprimido del PDF supera el límite permitido".into()));
  }
  Ok(budget - inflated)
}

fn pdf_text_within(bytes: &[u8], max_inflated: u64) -> Result<String, InsightsError> {
  if !bytes.starts_with(b"%PDF-") {
    return Err(InsightsError::Domain(DomainError::validation("el fichero no es un PDF")));
  }
  let doc = Document::load_mem(bytes).map_err(|e| InsightsError::Extraction(format!("PDF ilegible: {}", e)))?;
  let pages = doc.get_pages();

  let mut budget = max_inflated;
  for page_id in pages.values() {
    for content_id in doc.get_page_contents(*page_id) {
      if let Ok(stream) = doc.get_object(content_id).and_then(|o| o.as_stream()) {
        budget = charge_inflated(stream, budget)?;
      }
    }
  }

  let numbers: Vec<u32> = pages.keys().copied().collect();
  let raw = doc.extract_text(&numbers)
               .map_err(|e| InsightsError::Extraction(format!("no se pudo leer el texto del PDF: {}", e)))?;
  let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
  if lines.is_empty() {
    return Err(InsightsError::Extraction("el PDF no contiene texto extraíble".into()));
  }
  debug!(pages = numbers.len(), lines = lines.len(), "texto extraído del PDF");
  Ok(lines.join("\n"))
}

/// Extrae el texto visible de un PDF, una línea por bloque de texto.
///
/// La decodificación (codificaciones de fuente y mapas `ToUnicode`) la hace
/// `lopdf`. Antes se comprueba que los streams de contenido no se inflen
/// por encima de `MAX_INFLATED_BYTES`. PDFs escaneados no tienen texto.
pub fn pdf_text(bytes: &[u8]) -> Result<String, InsightsError> {
  pdf_text_within(bytes, MAX_INFLATED_BYTES)
}

// ---------------------------------------------------------------------------
// Extracción de preguntas
// ---------------------------------------------------------------------------

#[async_trait]
pub trait QuestionExtractor: Send + Sync {
  async fn extract(&self, text: &str) -> Result<Vec<ExtractedQuestion>, InsightsError>;
}

/// Cliente de un endpoint compatible con chat completions de OpenAI.
#[derive(Clone)]
pub struct LlmQuestionExtractor {
  client: reqwest::Client,
  url: String,
  api_key: Option<String>,
  model: String,
}

impl LlmQuestionExtractor {
  pub fn new(url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(),
           url: url.into(),
           api_key: api_key.filter(|k| !k.trim().is_empty()),
           model: model.into() }
  }
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
  content: Option<String>,
}

#[async_trait]
impl QuestionExtractor for LlmQuestionExtractor {
  async fn extract(&self, text: &str) -> Result<Vec<ExtractedQuestion>, InsightsError> {
    let text = text.trim();
    if text.is_empty() {
      return Err(DomainError::validation("no hay texto del que extraer preguntas").into());
    }
    let Some(api_key) = &self.api_key else {
      return Err(InsightsError::Config("FIVES_LLM_API_KEY no está definida".into()));
    };
    let prompt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
    let body = json!({
      "model": self.model,
      "temperature": 0.1,
      "messages": [
        { "role": "system", "content": SYSTEM_PROMPT.as_str() },
        { "role": "user", "content": prompt },
      ],
    });

    let resp = self.client
                   .post(&self.url)
                   .bearer_auth(api_key)
                   .json(&body)
                   .send()
                   .await
                   .map_err(|e| InsightsError::Upstream(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
      let detail = resp.text().await.unwrap_or_default();
      return Err(InsightsError::Upstream(format!("HTTP {}: {}", status, detail.chars().take(200).collect::<String>())));
    }
    let parsed: ChatResponse = resp.json().await.map_err(|e| InsightsError::Upstream(e.to_string()))?;
    let content = parsed.choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                        .ok_or_else(|| InsightsError::Upstream("respuesta sin contenido".into()))?;
    let questions = parse_questions(&content)?;
    debug!(count = questions.len(), "preguntas extraídas");
    Ok(questions)
  }
}

#[derive(Deserialize)]
struct RawQuestion {
  category: String,
  #[serde(alias = "question")]
  text: String,
}

/// Interpreta la respuesta del modelo: un array JSON, con o sin bloque
/// de código alrededor. Las categorías desconocidas se descartan.
pub fn parse_questions(content: &str) -> Result<Vec<ExtractedQuestion>, InsightsError> {
  let start = content.find('[');
  let end = content.rfind(']');
  let slice = match (start, end) {
    (Some(s), Some(e)) if s < e => &content[s..=e],
    _ => return Err(InsightsError::Extraction("la respuesta no contiene un array JSON".into())),
  };
  let raw: Vec<RawQuestion> =
    serde_json::from_str(slice).map_err(|e| InsightsError::Extraction(format!("JSON inválido: {}", e)))?;
  let mut out = Vec::with_capacity(raw.len());
  for q in raw {
    let text = q.text.trim();
    if text.is_empty() {
      continue;
    }
    match q.category.parse::<Pillar>() {
      Ok(category) => out.push(ExtractedQuestion { category, text: text.to_string() }),
      Err(_) => warn!(category = %q.category, "categoría desconocida, pregunta descartada"),
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use flate2::write::ZlibEncoder;
  use flate2::Compression;
  use lopdf::content::{Content, Operation};
  use lopdf::{dictionary, StringFormat};
  use std::io::Write;

  /// Documento de una página con la fuente `F1` y el contenido dado.
  fn one_page_pdf(font: impl FnOnce(&mut Document) -> lopdf::Dictionary, content: Stream) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font = font(&mut doc);
    let font_id = doc.add_object(font);
    let resources_id = doc.add_object(dictionary! { "Font" => dictionary! { "F1" => font_id } });
    let content_id = doc.add_object(content);
    let page_id = doc.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "Contents" => content_id,
      "Resources" => resources_id,
    });
    doc.objects.insert(pages_id,
                       Object::Dictionary(dictionary! {
                         "Type" => "Pages",
                         "Kids" => vec![page_id.into()],
                         "Count" => 1,
                         "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                       }));
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
  }

  fn courier(_: &mut Document) -> lopdf::Dictionary {
    dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier" }
  }

  fn text_block(lines: &[&str]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
      operations.push(Operation::new("BT", vec![]));
      operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
      operations.push(Operation::new("Td", vec![72.into(), (700 - 14 * i as i64).into()]));
      operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
      operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }.encode().unwrap()
  }

  fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
  }

  #[test]
  fn flate_stream_text_is_recovered_line_by_line() {
    let content = deflate(&text_block(&["Sort: Is the floor clear?", "Shine: Are machines clean?"]));
    let pdf = one_page_pdf(courier, Stream::new(dictionary! { "Filter" => "FlateDecode" }, content));
    let text = pdf_text(&pdf).unwrap();
    assert_eq!(text, "Sort: Is the floor clear?\nShine: Are machines clean?");
  }

  #[test]
  fn identity_h_glyphs_are_mapped_through_to_unicode() {
    let cmap = "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
                /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
                1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
                1 beginbfchar\n<0003> <0020>\nendbfchar\n\
                1 beginbfrange\n<0036> <005D> <0053>\nendbfrange\n\
                endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n";
    let type0 = |doc: &mut Document| {
      let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "Calibri",
        "CIDSystemInfo" => dictionary! {
          "Registry" => Object::string_literal("Adobe"),
          "Ordering" => Object::string_literal("Identity"),
          "Supplement" => 0,
        },
      });
      let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, cmap.as_bytes().to_vec()));
      dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "Calibri",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![descendant_id.into()],
        "ToUnicode" => to_unicode_id,
      }
    };

    // "Sleepers " escrito como ids de glifo de dos bytes, como lo guardan
    // los procesadores de texto.
    let glyphs = vec![0x00, 0x36, 0x00, 0x4F, 0x00, 0x48, 0x00, 0x48, 0x00, 0x53, 0x00, 0x48, 0x00, 0x55, 0x00, 0x56, 0x00,
                      0x03];
    let content = Content { operations: vec![Operation::new("BT", vec![]),
                                             Operation::new("Tf", vec!["F1".into(), 11.into()]),
                                             Operation::new("Tj",
                                                            vec![Object::String(glyphs, StringFormat::Hexadecimal)]),
                                             Operation::new("ET", vec![]),] }.encode()
                                                                             .unwrap();
    let pdf = one_page_pdf(type0, Stream::new(dictionary! {}, content));
    assert_eq!(pdf_text(&pdf).unwrap(), "Sleepers");
  }

  #[test]
  fn inflated_size_is_capped() {
    let lines: Vec<String> = (0..40).map(|i| format!("Seiri item {i}: retirar lo innecesario")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let plain = text_block(&refs);
    let pdf = one_page_pdf(courier, Stream::new(dictionary! { "Filter" => "FlateDecode" }, deflate(&plain)));

    let err = pdf_text_within(&pdf, plain.len() as u64 - 1).unwrap_err();
    assert!(matches!(err, InsightsError::Extraction(ref m) if m.contains("límite")), "{err}");
    assert!(pdf_text_within(&pdf, plain.len() as u64).is_ok());
    assert!(pdf_text(&pdf).unwrap().starts_with("Seiri item 0"));
  }

  #[test]
  fn rejects_non_pdf_and_textless_documents() {
    assert!(matches!(pdf_text(b"hola"), Err(InsightsError::Domain(DomainError::ValidationError(_)))));
    let drawing = one_page_pdf(courier, Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
    assert!(matches!(pdf_text(&drawing), Err(InsightsError::Extraction(_))));
    assert!(matches!(pdf_text(b"%PDF-1.4 basura"), Err(InsightsError::Extraction(_))));
  }

  #[test]
  fn parse_questions_strips_fences_and_skips_unknown_categories() {
    let content = "```json\n[{\"category\": \"Set in Order\", \"text\": \" ¿Herramientas rotuladas? \"},\
                   {\"category\": \"safety\", \"text\": \"¿EPIs?\"},\
                   {\"category\": \"seiso\", \"question\": \"¿Suelo limpio?\"}]\n```";
    let qs = parse_questions(content).unwrap();
    assert_eq!(qs,
               vec![ExtractedQuestion { category: Pillar::SetInOrder, text: "¿Herramientas rotuladas?".into() },
                    ExtractedQuestion { category: Pillar::Shine, text: "¿Suelo limpio?".into() }]);
    assert!(matches!(parse_questions("no hay nada"), Err(InsightsError::Extraction(_))));
  }

  #[test]
  fn extractor_without_api_key_is_a_config_error() {
    let extractor = LlmQuestionExtractor::new("http://localhost:9/v1/chat/completions", None, "gpt-4o-mini");
    let err = tokio_test::block_on(extractor.extract("Sort: floor clear?")).unwrap_err();
    assert!(matches!(err, InsightsError::Config(_)));
    let err = tokio_test::block_on(extractor.extract("   ")).unwrap_err();
    assert!(matches!(err, InsightsError::Domain(DomainError::ValidationError(_))));
  }
}
