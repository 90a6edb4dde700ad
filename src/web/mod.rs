//! HTTP Surface
//!
//! Form-encoded input, JSON views, and redirects carrying flash messages.
//! Every protected route passes the [`AccessGate`] first; a denial is always
//! a `303 See Other` to the matching entry point, never an HTTP error.

use axum::{
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::contacts::{ContactService, ContactStore, MySqlContactStore};
use crate::gate::{AccessGate, AuthService};
use crate::manager::ConnectionManager;
use crate::probe::{ConnectionProbe, MySqlProbe};
use crate::session::{MemorySessionStore, Session};

pub mod handlers;

/// Cookie carrying the session identifier
pub const SESSION_COOKIE: &str = "RUBRICA_SESSION";

/// Shared state behind every handler
pub struct AppState<P, S> {
    pub manager: ConnectionManager<P>,
    pub contacts: ContactService<S>,
    pub sessions: MemorySessionStore,
    pub auth: AuthService,
    pub gate: AccessGate,
}

impl<P: ConnectionProbe, S: ContactStore> AppState<P, S> {
    pub fn new(
        manager: ConnectionManager<P>,
        contacts: ContactService<S>,
        sessions: MemorySessionStore,
        auth: AuthService,
    ) -> Self {
        Self { manager, contacts, sessions, auth, gate: AccessGate }
    }

    /// Resume the caller's session from its cookie, or start a new one
    ///
    /// The returned jar carries a fresh cookie whenever the session changed.
    pub fn open_session(&self, jar: CookieJar) -> (Session, CookieJar) {
        let requested = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());
        let session = self.sessions.resume_or_create(requested);

        if requested == Some(session.id()) {
            (session, jar)
        } else {
            let jar = jar.add(session_cookie(session.id()));
            (session, jar)
        }
    }
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Build the application router over any probe and contact store
pub fn router<P, S>(state: Arc<AppState<P, S>>) -> Router
where
    P: ConnectionProbe + 'static,
    S: ContactStore + 'static,
{
    Router::new()
        .route("/", get(handlers::root))
        .route("/index", get(handlers::index::<P, S>))
        .route("/configure", post(handlers::configure::<P, S>))
        .route("/login", get(handlers::login_view::<P, S>).post(handlers::login::<P, S>))
        .route("/lista", get(handlers::list_contacts::<P, S>))
        .route("/editor", get(handlers::new_contact::<P, S>))
        .route("/editor/:id", get(handlers::edit_contact::<P, S>))
        .route("/salva", post(handlers::save_contact::<P, S>))
        .route("/elimina/:id", post(handlers::delete_contact::<P, S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the server with the MySQL probe and store until the process stops
///
/// When the configuration asks for it, the placeholder profile is offered to
/// the connection manager before the listener opens. A rejected placeholder
/// is logged and the service starts unconfigured.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let manager = ConnectionManager::with_timeout(MySqlProbe, config.probe_timeout);

    if config.adopt_initial_profile {
        match config.resolved_initial_profile() {
            Ok(Some(profile)) => {
                if let Err(e) = manager.reconfigure_with(profile).await {
                    tracing::warn!(error = %e, "initial profile not adopted, starting unconfigured");
                }
            }
            Ok(None) => tracing::warn!("adopt_initial_profile is set but no initial_profile is configured"),
            Err(e) => tracing::warn!(error = %e, "initial profile could not be resolved"),
        }
    }

    let state = Arc::new(AppState::new(
        manager,
        ContactService::new(MySqlContactStore),
        MemorySessionStore::new(config.session_idle_timeout),
        AuthService::new(config.auth.clone()),
    ));

    let app = router(state);

    tracing::info!(addr = %config.bind, "contacts service listening");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
