//! The filtered, paginated transaction query builder.
//!
//! Filters are composed as parameterized predicates joined with AND; values
//! are never interpolated into the SQL string.

use std::ops::RangeInclusive;

use rusqlite::{Connection, params_from_iter, types::Value};
use time::Date;

use crate::{
    Error,
    category::{Category, TransactionType},
    user::UserID,
};

use super::{Transaction, map_transaction_row};

/// Optional, conjunctive filters for transaction queries.
///
/// The owner is not part of the filter: every query is constrained to an
/// owner unconditionally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Free-text filter, matched as a substring against the description,
    /// category, type, and date columns.
    pub search: Option<String>,
    /// Exact-match category filter.
    pub category: Option<Category>,
    /// Exact-match type filter.
    pub transaction_type: Option<TransactionType>,
    /// Inclusive date range filter, e.g. one calendar month.
    pub date_range: Option<RangeInclusive<Date>>,
}

/// Build the WHERE clause and its parameters for `filter` scoped to `owner`.
///
/// Placeholders are numbered to match the position of each value in the
/// returned parameter list.
fn build_where_clause(filter: &TransactionFilter, owner: UserID) -> (String, Vec<Value>) {
    let mut where_clause_parts = Vec::new();
    let mut query_parameters = Vec::new();

    where_clause_parts.push(format!("user_id = ?{}", query_parameters.len() + 1));
    query_parameters.push(Value::Integer(owner.as_i64()));

    if let Some(search) = &filter.search {
        let placeholder = query_parameters.len() + 1;
        where_clause_parts.push(format!(
            "(description LIKE ?{placeholder} OR category LIKE ?{placeholder} \
             OR type LIKE ?{placeholder} OR date LIKE ?{placeholder})"
        ));
        query_parameters.push(Value::Text(format!("%{search}%")));
    }

    if let Some(category) = &filter.category {
        where_clause_parts.push(format!("category = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(category.as_str().to_string()));
    }

    if let Some(transaction_type) = filter.transaction_type {
        where_clause_parts.push(format!("type = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(transaction_type.as_str().to_string()));
    }

    if let Some(date_range) = &filter.date_range {
        where_clause_parts.push(format!(
            "date BETWEEN ?{} AND ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Text(date_range.start().to_string()));
        query_parameters.push(Value::Text(date_range.end().to_string()));
    }

    (
        String::from("WHERE ") + &where_clause_parts.join(" AND "),
        query_parameters,
    )
}

/// Count the transactions owned by `owner` that match `filter`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_transactions(
    filter: &TransactionFilter,
    owner: UserID,
    connection: &Connection,
) -> Result<u64, Error> {
    let (where_clause, query_parameters) = build_where_clause(filter, owner);
    let query_string = format!("SELECT COUNT(id) FROM \"transaction\" {where_clause}");

    connection
        .query_row(
            &query_string,
            params_from_iter(query_parameters.iter()),
            |row| row.get::<_, i64>(0).map(|count| count as u64),
        )
        .map_err(|error| error.into())
}

/// Query for the transactions owned by `owner` that match `filter`.
///
/// Results are ordered newest first (`date DESC`) with the ID as a stable
/// tie-break. `limit`/`offset` select a page of results; pass `None` for an
/// unbounded query.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn query_transactions(
    filter: &TransactionFilter,
    limit: Option<u64>,
    offset: u64,
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, mut query_parameters) = build_where_clause(filter, owner);

    let mut query_string = format!(
        "SELECT id, amount, type, category, description, date, user_id \
         FROM \"transaction\" {where_clause} ORDER BY date DESC, id DESC"
    );

    if let Some(limit) = limit {
        query_string.push_str(&format!(
            " LIMIT ?{} OFFSET ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Integer(limit as i64));
        query_parameters.push(Value::Integer(offset as i64));
    }

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get all of `owner`'s transactions in chronological order (`date ASC, id
/// ASC`), the order the reporting engine expects.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_transactions_for_report(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, amount, type, category, description, date, user_id \
             FROM \"transaction\" WHERE user_id = :user_id ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":user_id", &owner.as_i64())], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}
