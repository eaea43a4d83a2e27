//! Registration, login and logout endpoints.
//!
//! Each takes an urlencoded form with `alias` and `passhash`. Success sets the
//! session cookie; failure sets nothing.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::session::{AccountError, SessionClaim};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub passhash: String,
}

pub async fn register(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    let accounts = state.accounts.clone();
    let result =
        tokio::task::spawn_blocking(move || accounts.register(&form.alias, &form.passhash)).await;
    session_response(&state, "register", result)
}

pub async fn login(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    let accounts = state.accounts.clone();
    let result =
        tokio::task::spawn_blocking(move || accounts.login(&form.alias, &form.passhash)).await;
    session_response(&state, "login", result)
}

pub async fn logout(State(state): State<AppState>) -> Response {
    metrics::record_auth("logout", "ok");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, state.codec.clear_cookie_header())],
    )
        .into_response()
}

fn session_response(
    state: &AppState,
    action: &'static str,
    result: Result<Result<SessionClaim, AccountError>, tokio::task::JoinError>,
) -> Response {
    let claim = match result {
        Ok(Ok(claim)) => claim,
        Ok(Err(e)) => {
            tracing::info!(action, error = %e, "Authentication rejected");
            return (error_status(&e), e.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!(action, error = %e, "Account task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.codec.set_cookie_header(&claim) {
        Ok(cookie) => {
            tracing::info!(action, alias = %claim.alias, "Session issued");
            (StatusCode::OK, [(header::SET_COOKIE, cookie)]).into_response()
        }
        Err(e) => {
            tracing::error!(action, error = %e, "Failed to seal session cookie");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_status(error: &AccountError) -> StatusCode {
    match error {
        AccountError::EmptyAlias => StatusCode::BAD_REQUEST,
        AccountError::AliasTaken(_) => StatusCode::CONFLICT,
        AccountError::UnknownAlias(_) | AccountError::BadCredentials => StatusCode::UNAUTHORIZED,
        AccountError::Corrupt(_) | AccountError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
