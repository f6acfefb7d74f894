use crate::auth;
use crate::cfg;
use crate::db;
use crate::session;

pub type ArcContext = std::sync::Arc<Context>;

/// Shared server state: one instance built at startup, handed to every
/// route through axum state.
pub struct Context {
    pub db: db::Database,
    pub jwt: auth::JwtContext,
    pub settings: cfg::AppSettings,
    pub sessions: session::SessionRegistry,
}

impl Context {
    #[must_use]
    pub fn new(db: db::Database, jwt: auth::JwtContext, settings: cfg::AppSettings) -> ArcContext {
        Self {
            db,
            jwt,
            settings,
            sessions: session::create_session_registry(),
        }
        .into()
    }
}
