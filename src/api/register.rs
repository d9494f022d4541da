//! The handler for registering new users.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    user::create_user,
};

/// The data sent by the client to register a new user.
#[derive(Debug, Deserialize)]
pub struct RegisterData {
    /// The email to register with, used as the log-in name.
    pub email: String,
    /// The plain-text password. Hashed before storage, never persisted.
    pub password: String,
}

/// Handler for registering a new user via the POST method.
///
/// On success, responds with 201 and the new user's ID and email. The
/// password is validated and then hashed with bcrypt before storage.
///
/// # Errors
///
/// This function will return a:
/// - [Error::PasswordTooShort] (422) if the password fails validation,
/// - [Error::DuplicateEmail] (422) if the email is already registered,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn register_user(
    State(state): State<AppState>,
    Json(register_data): Json<RegisterData>,
) -> Result<Response, Error> {
    let password = ValidatedPassword::new(&register_data.password)?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = create_user(&register_data.email, password_hash, &connection)?;

    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({"id": user.id.as_i64(), "email": user.email})),
    )
        .into_response())
}

#[cfg(test)]
mod register_tests {
    use serde_json::json;

    use crate::{
        api::test_utils::{TEST_EMAIL, TEST_PASSWORD, new_test_server, new_test_state},
        endpoints,
    };

    #[tokio::test]
    async fn register_creates_user() {
        let server = new_test_server(new_test_state());

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["email"], TEST_EMAIL);
        assert!(body["id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let server = new_test_server(new_test_state());

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": "short"}))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let server = new_test_server(new_test_state());
        server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": "TEST@example.com", "password": TEST_PASSWORD}))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
