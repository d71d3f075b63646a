//! Dominio de auditorías 5S: entidades, reglas de validación y el contrato
//! de persistencia (`AuditRepository`) con su implementación en memoria.
mod action;
mod audit;
mod checklist;
mod errors;
mod memory_repository;
mod message;
mod notification_rule;
mod patch;
mod question;
mod record;
mod report;
mod repository;
mod schedule;
mod tag;
mod team;
mod user;
mod zone;

pub use action::{Action, ActionPriority, ActionStatus, ActionUpdate, NewAction};
pub use audit::{day_window, Audit, AuditStatus, AuditUpdate, NewAudit};
pub use checklist::{checklist_score, ChecklistAnswer, ChecklistItem, ChecklistResponse, NewChecklistItem, Pillar,
                    MAX_PHOTO_BYTES};
pub use errors::{DomainError, Result};
pub use memory_repository::InMemoryAuditRepository;
pub use message::{Message, MessageDraft, MessageUpdate};
pub use notification_rule::{NotificationRule, NotificationRuleDraft, RuleTrigger, DEFAULT_LOW_SCORE_THRESHOLD};
pub use question::{seed_checklist, Question, QuestionDraft};
pub use record::{Drafted, Record, RecordKind};
pub use report::{Report, ReportDraft};
pub use repository::{ensure_action_refs, ensure_record_refs, ensure_team, ensure_user, ensure_zone, AuditRepository,
                     RecordStore};
pub use schedule::{Frequency, Schedule, ScheduleDraft};
pub use tag::{Tag, TagDraft};
pub use team::{NewTeam, Team, TeamUpdate};
pub use user::{hash_api_key, NewUser, Role, User, UserSettings, UserUpdate};
pub use zone::{NewZone, Zone, ZoneUpdate};
