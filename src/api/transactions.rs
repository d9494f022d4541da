//! The handlers for creating, listing, updating, and deleting transactions.
//!
//! Every handler reads the owner's user ID from the request extension placed
//! there by the auth middleware, so a session can only ever touch its own
//! rows.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    category::{Category, TransactionType, categories_for},
    pagination::{Page, page_count},
    report::YearMonth,
    transaction::{
        TransactionDraft, TransactionFilter, TransactionId, count_transactions,
        create_transaction, delete_transaction, query_transactions, update_transaction,
    },
    user::UserID,
};

/// Date format for transaction dates on the wire, e.g. "2024-01-15".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The fields the client sends to create or replace a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionData {
    /// The amount of money spent or earned. Must be positive.
    pub amount: f64,
    /// "income" or "spending".
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// A category from the set for `transaction_type`.
    pub category: String,
    /// An optional free-text description.
    pub description: Option<String>,
    /// The transaction date as "YYYY-MM-DD". Defaults to today (UTC).
    pub date: Option<String>,
}

fn draft_from_data(data: TransactionData) -> Result<TransactionDraft, Error> {
    let transaction_type: TransactionType = data.transaction_type.parse()?;
    let category = Category::new(&data.category, transaction_type)?;
    let date = data
        .date
        .map(|raw| Date::parse(&raw, DATE_FORMAT).map_err(|_| Error::InvalidDate(raw)))
        .transpose()?;

    TransactionDraft::new(
        data.amount,
        transaction_type,
        category,
        data.description.as_deref().unwrap_or_default(),
        date,
    )
}

/// The optional query parameters accepted by the transaction listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// The maximum number of transactions to return. When `limit` or
    /// `offset` is present the response is a plain array.
    pub limit: Option<u64>,
    /// The number of transactions to skip.
    pub offset: Option<u64>,
    /// A 1-based page number, used when `limit`/`offset` are absent.
    pub page: Option<u64>,
    /// Free-text search over the description, category, type, and date.
    pub search: Option<String>,
    /// Exact-match category filter.
    pub category: Option<String>,
    /// Exact-match type filter.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

fn parse_transaction_type(raw: Option<&str>) -> Result<Option<TransactionType>, Error> {
    raw.map(str::parse).transpose()
}

/// Check a filter category against the set for `transaction_type`, or
/// against both sets when no type filter was given.
fn parse_filter_category(
    raw: &str,
    transaction_type: Option<TransactionType>,
) -> Result<Category, Error> {
    if let Some(transaction_type) = transaction_type {
        return Category::new(raw, transaction_type);
    }

    let name = raw.trim().to_lowercase();
    let known = categories_for(TransactionType::Income).contains(&name.as_str())
        || categories_for(TransactionType::Spending).contains(&name.as_str());

    if known {
        Ok(Category::new_unchecked(&name))
    } else {
        Err(Error::InvalidCategory {
            category: name,
            transaction_type: "income or spending".to_string(),
        })
    }
}

fn build_filter(
    search: Option<String>,
    category: Option<&str>,
    transaction_type: Option<&str>,
) -> Result<TransactionFilter, Error> {
    let transaction_type = parse_transaction_type(transaction_type)?;
    let category = category
        .map(|raw| parse_filter_category(raw, transaction_type))
        .transpose()?;

    Ok(TransactionFilter {
        search: search.filter(|text| !text.trim().is_empty()),
        category,
        transaction_type,
        date_range: None,
    })
}

/// Handler for listing the logged in user's transactions, newest first.
///
/// Two response shapes are supported:
/// - with `limit`/`offset` the response is a plain JSON array, which is what
///   scripted clients page through,
/// - otherwise the listing is paged: `page` selects a 1-based page (clamped
///   to the last page) and the response carries the page metadata alongside
///   the transactions.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidTransactionType] or [Error::InvalidCategory] (422) if a
///   filter parameter is invalid,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<ListParams>,
) -> Result<Response, Error> {
    let filter = build_filter(
        params.search,
        params.category.as_deref(),
        params.transaction_type.as_deref(),
    )?;
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    if params.limit.is_some() || params.offset.is_some() {
        let transactions = query_transactions(
            &filter,
            params.limit,
            params.offset.unwrap_or(0),
            user_id,
            &connection,
        )?;

        return Ok(Json(transactions).into_response());
    }

    let config = &state.pagination_config;
    let total = count_transactions(&filter, user_id, &connection)?;
    let page = Page::clamped(
        params.page.unwrap_or(config.default_page),
        total,
        config.page_size,
    );
    let transactions =
        query_transactions(&filter, Some(page.size), page.offset(), user_id, &connection)?;

    Ok(Json(json!({
        "transactions": transactions,
        "page": page.number,
        "page_count": page_count(total, page.size),
        "total": total,
    }))
    .into_response())
}

/// The query parameters accepted by the filtered listing.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    /// A calendar month as "YYYY-MM".
    pub month: Option<String>,
    /// Exact-match type filter.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Exact-match category filter.
    pub category: Option<String>,
}

/// Handler for listing the logged in user's transactions restricted to a
/// calendar month, type, and/or category. The response is a plain JSON
/// array, newest first, with no paging.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidDate] (422) if `month` is not a valid "YYYY-MM" string,
/// - [Error::InvalidTransactionType] or [Error::InvalidCategory] (422) if a
///   filter parameter is invalid,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn filter_transactions_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<crate::transaction::Transaction>>, Error> {
    let mut filter = build_filter(
        None,
        params.category.as_deref(),
        params.transaction_type.as_deref(),
    )?;
    filter.date_range = params
        .month
        .map(|raw| raw.parse::<YearMonth>().map(|month| month.date_range()))
        .transpose()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let transactions = query_transactions(&filter, None, 0, user_id, &connection)?;

    Ok(Json(transactions))
}

/// Handler for creating a transaction owned by the logged in user.
///
/// Responds with 201 and the stored transaction, including its new ID.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount], [Error::InvalidTransactionType],
///   [Error::InvalidCategory], or [Error::InvalidDate] (422) if validation
///   fails,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(data): Json<TransactionData>,
) -> Result<Response, Error> {
    let draft = draft_from_data(data)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let transaction = create_transaction(draft, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}

/// Handler for replacing the mutable fields of one of the logged in user's
/// transactions.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] (404) if the transaction does not exist or belongs to
///   another user,
/// - a validation error (422) if the replacement fields are invalid,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(data): Json<TransactionData>,
) -> Result<Json<crate::transaction::Transaction>, Error> {
    let draft = draft_from_data(data)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let transaction = update_transaction(transaction_id, user_id, draft, &connection)?;

    Ok(Json(transaction))
}

/// Handler for deleting one of the logged in user's transactions.
///
/// Responds with 204 on success.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] (404) if the transaction does not exist or belongs to
///   another user,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    delete_transaction(transaction_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
