/// Buddy API
///
/// HTTP handlers, authentication and authorization for the Buddy Brno
/// backend, plus the background notification job.
pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod languages;
pub mod mailer;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod policy;
pub mod query;
pub mod routes;
pub mod token;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use config::Config;
pub use routes::router;
