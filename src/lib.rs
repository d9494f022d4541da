//! MyBank is a personal finance tracker that records income and spending
//! transactions and reports summary statistics.
//!
//! This library provides:
//! - a JSON REST API with cookie-based sessions (see [build_router]),
//! - the SQLite persistence and reporting layers shared by the `server`,
//!   `cli`, and `remote` binaries,
//! - an HTTP client wrapper for driving the API from the command line.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub mod api;
pub mod auth_cookie;
pub mod auth_middleware;
pub mod backup;
pub mod category;
pub mod client;
pub mod db;
pub mod endpoints;
pub mod logging;
pub mod pagination;
pub mod password;
pub mod report;
pub mod routing;
mod state;
pub mod transaction;
pub mod user;

pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use state::{AppState, create_cookie_key};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email/password combination that does not match a
    /// registered user, or presented an invalid session cookie.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email used to register already belongs to another user.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// The password used to register is shorter than the required minimum.
    #[error("password must be at least {0} characters long")]
    PasswordTooShort(usize),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A transaction amount was not a positive number.
    #[error("amount must be a positive number, got \"{0}\"")]
    InvalidAmount(String),

    /// A transaction type was not "income" or "spending".
    #[error("type must be income or spending, got \"{0}\"")]
    InvalidTransactionType(String),

    /// A category did not belong to the category set for its transaction type.
    #[error("\"{category}\" is not a valid {transaction_type} category")]
    InvalidCategory {
        /// The rejected category name.
        category: String,
        /// The transaction type whose category set was checked.
        transaction_type: String,
    },

    /// A date string could not be parsed as a calendar date.
    #[error("could not parse \"{0}\" as a date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, this also covers rows that exist but belong
    /// to another user: the two cases are indistinguishable from the outside.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An auth cookie could not be created or updated.
    #[error("cookie error: {0}")]
    CookieError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An I/O error while reading or writing a backup file.
    #[error("backup file error: {0}")]
    BackupIo(String),

    /// An error from the HTTP client used by the remote front-end.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::DuplicateEmail
            | Error::PasswordTooShort(_)
            | Error::InvalidAmount(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidCategory { .. }
            | Error::InvalidDate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ref error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
