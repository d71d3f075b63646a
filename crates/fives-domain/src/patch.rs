// patch.rs
// Helpers para cuerpos PATCH/PUT parciales: distinguen "campo ausente"
// (`None`) de "campo a null" (`Some(None)`).
use serde::{Deserialize, Deserializer};

pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
  where D: Deserializer<'de>,
        T: Deserialize<'de>
{
  Option::<T>::deserialize(deserializer).map(Some)
}

/// Aplica un campo doble-opción sobre el destino.
pub(crate) fn apply<T>(target: &mut Option<T>, patch: Option<Option<T>>) {
  if let Some(v) = patch {
    *target = v;
  }
}

/// Normaliza texto libre opcional: recorta y convierte "" en `None`.
pub(crate) fn clean(text: Option<String>) -> Option<String> {
  text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
