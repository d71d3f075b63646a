//! Servicios de lectura sobre el repositorio de auditorías: agregado del
//! dashboard con cache, notificaciones derivadas, actualización masiva de
//! acciones, prueba de reglas, informe de texto y extracción de preguntas
//! desde PDF.
mod bulk;
mod dashboard;
mod errors;
mod extraction;
mod notifications;
mod reports;
mod rules;

pub use bulk::{bulk_update_actions, BulkActionUpdate, BulkFailure, BulkUpdateOutcome};
pub use dashboard::{assignee_actions_key, compute_stats, zone_audits_key, CachedView, DashboardService, DashboardStats,
                    STATS_KEY};
pub use errors::InsightsError;
pub use extraction::{parse_questions, pdf_text, ExtractedQuestion, LlmQuestionExtractor, QuestionExtractor};
pub use notifications::{generate as notifications_for, Notification, NotificationPriority, NotificationType};
pub use reports::{render_audit_report, report_filename};
pub use rules::{evaluate_rule, RuleTestOutcome};
