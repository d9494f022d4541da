//! The handler for log-in requests.
//!
//! The auth_cookie module handles the lower level cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::{AppState, Error, auth_cookie::set_auth_cookie, user::authenticate};

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent by the client to log in.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The email the user registered with.
    pub email: String,
    /// The user's plain-text password.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookies are set and `{"ok": true}` is returned.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidCredentials] (401) if the email does not belong to a
///   registered user or the password is wrong (the two cases are reported
///   identically),
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Json(user_data): Json<LogInData>,
) -> Result<Response, Error> {
    let user = {
        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

        authenticate(&user_data.email, &user_data.password, &connection)?
    };

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)
        .map_err(|error| Error::CookieError(error.to_string()))?;

    tracing::info!("user {} logged in", user.id);

    Ok((jar, Json(json!({"ok": true}))).into_response())
}

#[cfg(test)]
mod log_in_tests {
    use serde_json::json;

    use crate::{
        api::test_utils::{TEST_EMAIL, TEST_PASSWORD, new_test_server, new_test_state},
        auth_cookie::COOKIE_USER_ID,
        endpoints,
    };

    #[tokio::test]
    async fn log_in_with_valid_credentials_sets_auth_cookie() {
        let server = new_test_server(new_test_state());
        server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"ok": true}));
        assert!(response.maybe_cookie(COOKIE_USER_ID).is_some());
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_is_unauthorized() {
        let server = new_test_server(new_test_state());
        server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"email": TEST_EMAIL, "password": "notthepassword"}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_in_with_unknown_email_is_unauthorized() {
        let server = new_test_server(new_test_state());

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"email": "nobody@example.com", "password": TEST_PASSWORD}))
            .await;

        response.assert_status_unauthorized();
    }
}
