//! Crate `fives-cache`: cache en memoria con expiración por entrada.
//!
//! Expone `TtlCache`, un mapa clave → valor donde cada entrada guarda el
//! instante de captura y su propio TTL, y el trait `Clock` que permite
//! inyectar el reloj (real o manual en pruebas).
//!
//! Diseño resumido:
//! - Expiración perezosa: una entrada vencida se elimina al leerla; no hay
//!   barrido en segundo plano.
//! - Escrituras sin merge: `set` reemplaza siempre la entrada anterior.
//! - Invalidación gruesa por subcadena (`invalidate_pattern`) para borrar
//!   familias completas de claves (por zona, por responsable).
//!
//! Ejemplo rápido:
//! ```rust
//! use fives_cache::{ManualClock, TtlCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//! let clock = Arc::new(ManualClock::default());
//! let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), clock.clone());
//! cache.set("dashboard_stats", 7);
//! assert_eq!(cache.get("dashboard_stats"), Some(7));
//! clock.advance(Duration::from_secs(61));
//! assert_eq!(cache.get("dashboard_stats"), None);
//! ```
pub mod clock;
pub mod ttl_cache;

pub use clock::*;
pub use ttl_cache::*;
