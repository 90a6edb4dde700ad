use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::contacts::{Contact, ContactForm, ContactStore};
use crate::error::RubricaError;
use crate::manager::ConfigurationState;
use crate::output::{Flash, ViewEnvelope};
use crate::probe::ConnectionProbe;
use crate::profile::{ConnectionProfile, RawProfileFields};
use crate::session::{Session, SessionAttributes, ERROR_MESSAGE, LOGGED_USER, SUCCESS_MESSAGE};

use super::AppState;

type Shared<P, S> = State<Arc<AppState<P, S>>>;

#[derive(Debug, Serialize)]
pub struct IndexView {
    pub configured: bool,
    /// Password-free description of the live target
    pub connection: String,
}

#[derive(Debug, Serialize)]
pub struct LoginView {}

#[derive(Debug, Serialize)]
pub struct ListView {
    pub user: Option<String>,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Serialize)]
pub struct EditorView {
    pub contact: Contact,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn flash_to(session: &Session, key: &str, message: impl Into<String>, target: &str) -> Redirect {
    session.set_attribute(key, message.into());
    Redirect::to(target)
}

/// Redirect for a gate denial
fn deny(session: &Session, err: &RubricaError) -> Redirect {
    let target = match err {
        RubricaError::NotAuthenticated => "/login",
        _ => "/index",
    };
    tracing::debug!(code = err.error_code(), redirect = target, "request denied by gate");
    flash_to(session, ERROR_MESSAGE, err.message(), target)
}

/// Run the full gate and hand back the live target to work against
fn admit<P: ConnectionProbe, S: ContactStore>(
    state: &AppState<P, S>,
    session: &Session,
) -> Result<Arc<ConnectionProfile>, Redirect> {
    if let Err(e) = state.gate.evaluate(&state.manager, session).into_result() {
        return Err(deny(session, &e));
    }
    state
        .manager
        .current()
        .ok_or_else(|| deny(session, &RubricaError::DatabaseNotConfigured))
}

fn parse_id(raw: &str) -> Result<u64, RubricaError> {
    raw.trim()
        .parse()
        .map_err(|_| RubricaError::invalid_input(format!("'{raw}' is not a contact id")))
}

/// # GET /
pub async fn root() -> Redirect {
    Redirect::to("/index")
}

/// # GET /index
/// Configuration view; open to everyone.
pub async fn index<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let view = ViewEnvelope::new(
        "index",
        Flash::take(&session),
        IndexView {
            configured: state.manager.is_configured(),
            connection: state.manager.describe(),
        },
    );
    (jar, Json(view)).into_response()
}

/// # POST /configure
/// Validate, probe and adopt a new connection target.
pub async fn configure<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
    Form(fields): Form<RawProfileFields>,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let redirect = match state.manager.reconfigure(&fields).await {
        Ok(_) => Redirect::to("/login"),
        Err(e) => flash_to(&session, ERROR_MESSAGE, format!("Configuration error: {e}"), "/index"),
    };
    (jar, redirect).into_response()
}

/// # GET /login
/// Only requires a configured database.
pub async fn login_view<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
) -> Response {
    let (session, jar) = state.open_session(jar);
    if let Err(e) = state.gate.evaluate_configured(&state.manager).into_result() {
        return (jar, deny(&session, &e)).into_response();
    }
    let view = ViewEnvelope::new("login", Flash::take(&session), LoginView {});
    (jar, Json(view)).into_response()
}

/// # POST /login
pub async fn login<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let (session, jar) = state.open_session(jar);
    if let Err(e) = state.gate.evaluate_configured(&state.manager).into_result() {
        return (jar, deny(&session, &e)).into_response();
    }

    let redirect = if state.auth.authenticate(&form.username, &form.password) {
        state.auth.login(&session, &form.username);
        tracing::info!(user = %form.username, "login succeeded");
        Redirect::to("/lista")
    } else {
        tracing::info!(user = %form.username, "login rejected");
        flash_to(&session, ERROR_MESSAGE, "Invalid credentials", "/login")
    };
    (jar, redirect).into_response()
}

/// # GET /lista
pub async fn list_contacts<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let profile = match admit(state.as_ref(), &session) {
        Ok(profile) => profile,
        Err(redirect) => return (jar, redirect).into_response(),
    };

    match state.contacts.list(&profile).await {
        Ok(contacts) => {
            let view = ViewEnvelope::new(
                "lista",
                Flash::take(&session),
                ListView { user: session.attribute(LOGGED_USER), contacts },
            );
            (jar, Json(view)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "listing contacts failed");
            (jar, flash_to(&session, ERROR_MESSAGE, e.message(), "/index")).into_response()
        }
    }
}

/// # GET /editor
/// Empty form for a new contact.
pub async fn new_contact<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
) -> Response {
    let (session, jar) = state.open_session(jar);
    if let Err(redirect) = admit(state.as_ref(), &session) {
        return (jar, redirect).into_response();
    }
    let view = ViewEnvelope::new("editor", Flash::take(&session), EditorView { contact: Contact::default() });
    (jar, Json(view)).into_response()
}

/// # GET /editor/:id
pub async fn edit_contact<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let profile = match admit(state.as_ref(), &session) {
        Ok(profile) => profile,
        Err(redirect) => return (jar, redirect).into_response(),
    };

    let loaded = match parse_id(&id) {
        Ok(id) => state.contacts.get(&profile, id).await,
        Err(e) => Err(e),
    };
    match loaded {
        Ok(contact) => {
            let view = ViewEnvelope::new("editor", Flash::take(&session), EditorView { contact });
            (jar, Json(view)).into_response()
        }
        Err(e) => {
            let message = format!("Could not load contact: {}", e.message());
            (jar, flash_to(&session, ERROR_MESSAGE, message, "/lista")).into_response()
        }
    }
}

/// # POST /salva
/// Insert when the form carries no id, update otherwise.
pub async fn save_contact<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
    Form(form): Form<ContactForm>,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let profile = match admit(state.as_ref(), &session) {
        Ok(profile) => profile,
        Err(redirect) => return (jar, redirect).into_response(),
    };

    let contact = match form.into_contact() {
        Ok(contact) => contact,
        Err(e) => return (jar, flash_to(&session, ERROR_MESSAGE, e.message(), "/lista")).into_response(),
    };

    let (result, done, failed) = if contact.id.is_some() {
        (
            state.contacts.update(&profile, &contact).await,
            "Contact updated successfully",
            "The contact could not be updated",
        )
    } else {
        (
            state.contacts.create(&profile, &contact).await,
            "Contact saved successfully",
            "The contact could not be saved",
        )
    };

    let redirect = match result {
        Ok(true) => flash_to(&session, SUCCESS_MESSAGE, done, "/lista"),
        Ok(false) => flash_to(&session, ERROR_MESSAGE, failed, "/lista"),
        Err(e) => {
            tracing::warn!(error = %e, "saving contact failed");
            flash_to(&session, ERROR_MESSAGE, e.message(), "/lista")
        }
    };
    (jar, redirect).into_response()
}

/// # POST /elimina/:id
pub async fn delete_contact<P: ConnectionProbe, S: ContactStore>(
    State(state): Shared<P, S>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let (session, jar) = state.open_session(jar);
    let profile = match admit(state.as_ref(), &session) {
        Ok(profile) => profile,
        Err(redirect) => return (jar, redirect).into_response(),
    };

    let removed = match parse_id(&id) {
        Ok(id) => state.contacts.delete(&profile, id).await,
        Err(e) => Err(e),
    };
    let redirect = match removed {
        Ok(true) => flash_to(&session, SUCCESS_MESSAGE, "Contact deleted successfully", "/lista"),
        Ok(false) => flash_to(&session, ERROR_MESSAGE, "The contact could not be deleted", "/lista"),
        Err(e) => {
            tracing::warn!(error = %e, "deleting contact failed");
            flash_to(&session, ERROR_MESSAGE, e.message(), "/lista")
        }
    };
    (jar, redirect).into_response()
}
