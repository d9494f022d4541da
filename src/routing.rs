//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    api::{
        create_transaction_endpoint, delete_transaction_endpoint, filter_transactions_endpoint,
        get_log_out, get_stats, get_transactions_endpoint, post_log_in, register_user,
        update_transaction_endpoint,
    },
    auth_middleware::{AuthState, auth_guard},
    endpoints,
    logging::logging_middleware,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::USERS, post(register_user));

    let auth_state = AuthState::from_ref(&state);
    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_FILTER,
            get(filter_transactions_endpoint),
        )
        .route(endpoints::STATS, get(get_stats))
        .layer(middleware::from_fn_with_state(auth_state, auth_guard));

    unprotected_routes
        .merge(protected_routes)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
