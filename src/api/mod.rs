//! The JSON request handlers behind the REST API routes.
//!
//! Handlers in this module translate between HTTP and the library layers:
//! they validate input, call into the transaction/report/user functions, and
//! serialize the results. All responses, including errors, are JSON.

mod log_in;
mod log_out;
mod register;
mod stats;
mod transactions;

pub use log_in::{LogInData, LoginState, post_log_in};
pub use log_out::get_log_out;
pub use register::register_user;
pub use stats::get_stats;
pub use transactions::{
    create_transaction_endpoint, delete_transaction_endpoint, filter_transactions_endpoint,
    get_transactions_endpoint, update_transaction_endpoint,
};

#[cfg(test)]
pub(crate) mod test_utils {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, build_router, endpoints, pagination::PaginationConfig};

    pub const TEST_EMAIL: &str = "test@example.com";
    pub const TEST_PASSWORD: &str = "averysecurepassword";

    pub fn new_test_state() -> AppState {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");

        AppState::new(connection, "42", PaginationConfig::default())
            .expect("Could not create app state")
    }

    pub fn new_test_server(state: AppState) -> TestServer {
        let mut server = TestServer::new(build_router(state));
        server.save_cookies();

        server
    }

    /// Register a user and log in, leaving the session cookies in the
    /// server's cookie jar.
    pub async fn register_and_log_in(server: &TestServer) {
        server
            .post(endpoints::USERS)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
            .await
            .assert_status_ok();
    }
}
