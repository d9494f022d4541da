//! Log-out route handler that invalidates the authentication cookies.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;

use crate::auth_cookie::invalidate_auth_cookie;

/// Invalidate the auth cookies so the client is no longer logged in.
///
/// Logging out is idempotent: a request without a session succeeds too.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, Json(json!({"ok": true}))).into_response()
}
