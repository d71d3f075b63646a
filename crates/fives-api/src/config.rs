// config.rs
use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Configuración del servidor leída del entorno (y de `.env` si existe).
#[derive(Debug, Clone)]
pub struct Config {
  pub port: u16,
  /// Sin URL el servidor usa el almacenamiento en memoria.
  pub database_url: Option<String>,
  pub dashboard_ttl: Duration,
  pub lookup_ttl: Duration,
  pub admin_api_key: Option<String>,
  pub llm_url: String,
  pub llm_api_key: Option<String>,
  pub llm_model: String,
}

impl Default for Config {
  fn default() -> Self {
    Self { port: 8080,
           database_url: None,
           dashboard_ttl: Duration::from_secs(120),
           lookup_ttl: Duration::from_secs(300),
           admin_api_key: None,
           llm_url: DEFAULT_LLM_URL.into(),
           llm_api_key: None,
           llm_model: DEFAULT_LLM_MODEL.into() }
  }
}

impl Config {
  pub fn load() -> Self {
    if let Err(e) = dotenvy::dotenv() {
      info!("Sin fichero .env ({e}), sólo variables de entorno");
    }
    let defaults = Self::default();
    Self { port: try_load("FIVES_PORT", defaults.port),
           database_url: optional("DATABASE_URL"),
           dashboard_ttl: Duration::from_secs(try_load("FIVES_DASHBOARD_TTL_SECS", defaults.dashboard_ttl.as_secs())),
           lookup_ttl: Duration::from_secs(try_load("FIVES_LOOKUP_TTL_SECS", defaults.lookup_ttl.as_secs())),
           admin_api_key: optional("FIVES_ADMIN_API_KEY"),
           llm_url: optional("FIVES_LLM_URL").unwrap_or(defaults.llm_url),
           llm_api_key: optional("FIVES_LLM_API_KEY"),
           llm_model: optional("FIVES_LLM_MODEL").unwrap_or(defaults.llm_model) }
  }
}

fn optional(key: &str) -> Option<String> {
  env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Valor tipado de `key`; ausente o inválido vuelve al defecto con aviso.
fn try_load<T>(key: &str, default: T) -> T
  where T: FromStr + Display,
        T::Err: Display
{
  match optional(key) {
    None => {
      info!("{key} not set, using default: {default}");
      default
    }
    Some(raw) => raw.parse().unwrap_or_else(|e| {
                               warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
                               default
                             }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_values_fall_back_to_default() {
    env::set_var("FIVES_TEST_PORT_BAD", "no-es-un-puerto");
    assert_eq!(try_load("FIVES_TEST_PORT_BAD", 8080u16), 8080);
    env::set_var("FIVES_TEST_PORT_OK", " 9090 ");
    assert_eq!(try_load("FIVES_TEST_PORT_OK", 8080u16), 9090);
    assert_eq!(try_load("FIVES_TEST_PORT_MISSING", 7u64), 7);
  }

  #[test]
  fn blank_optional_is_none() {
    env::set_var("FIVES_TEST_BLANK", "   ");
    assert_eq!(optional("FIVES_TEST_BLANK"), None);
  }
}
