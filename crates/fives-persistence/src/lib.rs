//! Persistencia Diesel para `AuditRepository`.
//! SQLite por defecto; con la feature `pg` el mismo código usa Postgres.
//! Las migraciones se embeben y se aplican al abrir el repositorio.

mod audit_persistence;
pub mod schema;

pub use audit_persistence::{new_from_env, DieselAuditRepository, MIGRATIONS};
