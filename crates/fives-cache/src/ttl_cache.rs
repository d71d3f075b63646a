// Archivo: ttl_cache.rs
// Propósito: cache clave → valor con TTL independiente por entrada y
// expiración perezosa.
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Entrada almacenada: valor + instante de captura + TTL propio.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: chrono::Duration,
}

impl<V> CacheEntry<V> {
    /// Fresca mientras `now - stored_at <= ttl` (el borde cuenta como hit).
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at <= self.ttl
    }
}

/// Cache con TTL por entrada.
///
/// Los valores se devuelven clonados; para payloads grandes conviene
/// guardar `Arc<T>`. Es seguro compartirla entre hilos (`DashMap`), pero no
/// ofrece single-flight: dos lecturas concurrentes de una clave fría pueden
/// recalcular el valor dos veces.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Crea una cache vacía con el TTL por defecto y el reloj indicados.
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), default_ttl, clock }
    }

    /// TTL aplicado por `set`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Guarda `value` con el TTL por defecto, reemplazando lo que hubiera.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Guarda `value` con un TTL explícito, reemplazando lo que hubiera.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let entry = CacheEntry { value, stored_at: self.clock.now(), ttl };
        self.entries.insert(key.into(), entry);
    }

    /// Devuelve el valor si sigue fresco. Una entrada vencida se elimina en
    /// este mismo acceso y no vuelve a aparecer.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        // El guard del shard debe soltarse antes de `remove_if`.
        let lookup = self.entries
                         .get(key)
                         .map(|e| if e.is_fresh(now) { Some(e.value.clone()) } else { None });
        match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // Sólo se borra si sigue vencida: un `set` concurrente gana.
                self.entries.remove_if(key, |_, e| !e.is_fresh(now));
                None
            }
            None => None,
        }
    }

    /// Lee la clave o, si no hay hit, calcula el valor con `compute`, lo
    /// guarda con el TTL por defecto y lo devuelve. Los errores de
    /// `compute` se propagan sin tocar la cache.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> Result<V, E>
        where F: FnOnce() -> Result<V, E>
    {
        self.get_or_try_insert_with_ttl(key, self.default_ttl, compute)
    }

    /// Igual que `get_or_try_insert_with` pero con TTL explícito.
    pub fn get_or_try_insert_with_ttl<E, F>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
        where F: FnOnce() -> Result<V, E>
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.set_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    /// Elimina la clave sin condiciones. Devuelve si existía.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Elimina toda clave que contenga `pattern` como subcadena y devuelve
    /// cuántas se borraron.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|k, _| {
            let hit = k.contains(pattern);
            if hit {
                removed += 1;
            }
            !hit
        });
        removed
    }

    /// Vacía la cache.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Número de entradas almacenadas, incluidas las vencidas aún no leídas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(ttl_secs: u64) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TtlCache::new(Duration::from_secs(ttl_secs), clock.clone()), clock)
    }

    #[test]
    fn entry_is_fresh_exactly_at_ttl() {
        let (cache, clock) = cache(10);
        cache.set("k", "v".to_string());
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn stale_read_evicts_entry() {
        let (cache, clock) = cache(1);
        cache.set("k", "v".to_string());
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn per_entry_ttl_is_independent() {
        let (cache, clock) = cache(60);
        cache.set_with_ttl("short", "a".to_string(), Duration::from_secs(5));
        cache.set("long", "b".to_string());
        clock.advance(Duration::from_secs(30));
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long").as_deref(), Some("b"));
    }

    #[test]
    fn compute_error_leaves_cache_untouched() {
        let (cache, _clock) = cache(60);
        let res: Result<String, &str> = cache.get_or_try_insert_with("k", || Err("boom"));
        assert_eq!(res, Err("boom"));
        assert!(cache.is_empty());
    }
}
