//! Rutas REST bajo `/api`. Cada submódulo expone un `router()` que se
//! anida en `build_router`.
pub mod actions;
pub mod audits;
pub mod dashboard;
pub mod messages;
pub mod records;
pub mod teams;
pub mod users;
pub mod zones;

use axum::{routing::post, Router};
use fives_domain::{NotificationRule, Question, Report, Schedule, Tag};

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
  Router::new().nest("/users", users::router())
               .nest("/zones", zones::router())
               .nest("/teams", teams::router())
               .nest("/audits", audits::router())
               .nest("/actions", actions::router())
               .nest("/messages", messages::router())
               .nest("/schedules", records::router::<Schedule>())
               .nest("/reports", records::router::<Report>())
               .nest("/tags", records::router::<Tag>())
               .nest("/questions",
                     records::router::<Question>().route("/extract-pdf", post(records::extract_questions)))
               .nest("/notification-rules",
                     records::router::<NotificationRule>().route("/:id/test", post(records::test_rule)))
               .merge(dashboard::router())
}
