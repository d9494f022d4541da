//! Defines the core data model, input validation, and database queries for
//! transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::{Category, TransactionType},
    user::UserID,
};

/// An alias for the integer IDs used by the transaction table.
pub type TransactionId = i64;

/// The description stored when the user submits a blank description.
pub const DESCRIPTION_PLACEHOLDER: &str = "(no description)";

// ============================================================================
// MODELS
// ============================================================================

/// An income or spending event.
///
/// To create a new `Transaction`, validate the input with
/// [TransactionDraft::new] and insert it with [create_transaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// Whether the transaction is income or spending.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category the transaction belongs to.
    pub category: Category,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
    /// The user the transaction belongs to.
    pub user_id: UserID,
}

/// A transaction that has passed input validation but has not been persisted.
///
/// All validation happens here, before the database layer: the database
/// functions assume drafts are well formed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    /// The amount of money spent or earned. Always positive.
    pub amount: f64,
    /// Whether the transaction is income or spending.
    pub transaction_type: TransactionType,
    /// The category, guaranteed to belong to the set for `transaction_type`.
    pub category: Category,
    /// The description, never blank (see [DESCRIPTION_PLACEHOLDER]).
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
}

impl TransactionDraft {
    /// Validate the fields of a new or edited transaction.
    ///
    /// A blank `description` is replaced with [DESCRIPTION_PLACEHOLDER] and a
    /// missing `date` defaults to today (UTC).
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `amount` is not a positive, finite
    /// number. The category/type invariant is enforced by [Category::new]
    /// before this function is reached.
    pub fn new(
        amount: f64,
        transaction_type: TransactionType,
        category: Category,
        description: &str,
        date: Option<Date>,
    ) -> Result<Self, Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidAmount(amount.to_string()));
        }

        let description = if description.trim().is_empty() {
            DESCRIPTION_PLACEHOLDER.to_string()
        } else {
            description.trim().to_string()
        };

        let date = date.unwrap_or_else(|| OffsetDateTime::now_utc().date());

        Ok(Self {
            amount,
            transaction_type,
            category,
            description,
            date,
        })
    }
}

/// Parse a user-supplied amount string into a positive number.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `raw` is not a number or not positive.
pub fn parse_amount(raw: &str) -> Result<f64, Error> {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(Error::InvalidAmount(raw.trim().to_string())),
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a validated draft.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    draft: TransactionDraft,
    owner: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, type, category, description, date, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, amount, type, category, description, date, user_id",
        )?
        .query_row(
            (
                draft.amount,
                draft.transaction_type.as_str(),
                draft.category.as_str(),
                draft.description,
                draft.date,
                owner.as_i64(),
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction by its `id`, scoped to `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `owner` (a row owned by someone else is reported the same way),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    owner: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, amount, type, category, description, date, user_id
             FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Replace the mutable fields of the transaction `id` owned by `owner`.
///
/// The update is all-or-nothing: when the row is missing or owned by another
/// user, nothing is written.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    owner: UserID,
    draft: TransactionDraft,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET amount = ?1, type = ?2, category = ?3, description = ?4, date = ?5
         WHERE id = ?6 AND user_id = ?7",
        (
            draft.amount,
            draft.transaction_type.as_str(),
            draft.category.as_str(),
            &draft.description,
            draft.date,
            id,
            owner.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_transaction(id, owner, connection)
}

/// Delete the transaction `id` owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    owner: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total number of transactions in the database across all users.
///
/// Used to decide whether seeding from a legacy backup file should run.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_all_transactions(connection: &Connection) -> Result<u64, Error> {
    // SQLite counts are signed, but a COUNT can never be negative.
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get::<_, i64>(0).map(|count| count as u64)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Composite index used by the owner-scoped listing and report queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let raw_type: String = row.get(2)?;
    let raw_category: String = row.get(3)?;
    let description = row.get(4)?;
    let date = row.get(5)?;
    let user_id: i64 = row.get(6)?;

    // Rows were validated on insertion, so the stored type string is one of
    // the two known values.
    let transaction_type = match raw_type.as_str() {
        "income" => TransactionType::Income,
        _ => TransactionType::Spending,
    };

    Ok(Transaction {
        id,
        amount,
        transaction_type,
        category: Category::new_unchecked(&raw_category),
        description,
        date,
        user_id: UserID::new(user_id),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod test_utils {
    use rusqlite::Connection;

    use crate::{PasswordHash, db::initialize, user::{UserID, create_user}};

    // The lowest cost bcrypt accepts, used to keep the tests fast.
    pub const MIN_COST: u32 = 4;

    pub fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    pub fn create_test_user(email: &str, conn: &Connection) -> UserID {
        create_user(
            email,
            PasswordHash::from_raw_password("averysecurepassword", MIN_COST).unwrap(),
            conn,
        )
        .expect("Could not create test user")
        .id
    }
}

#[cfg(test)]
mod draft_tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        category::{Category, TransactionType},
    };

    use super::{DESCRIPTION_PLACEHOLDER, TransactionDraft, parse_amount};

    fn work_category() -> Category {
        Category::new("work", TransactionType::Income).unwrap()
    }

    #[test]
    fn rejects_non_positive_amount() {
        for amount in [0.0, -12.5, f64::NAN, f64::INFINITY] {
            let result = TransactionDraft::new(
                amount,
                TransactionType::Income,
                work_category(),
                "",
                None,
            );

            assert!(
                matches!(result, Err(Error::InvalidAmount(_))),
                "amount {amount} should be rejected"
            );
        }
    }

    #[test]
    fn blank_description_gets_placeholder() {
        let draft = TransactionDraft::new(
            10.0,
            TransactionType::Income,
            work_category(),
            "   ",
            Some(date!(2024 - 01 - 15)),
        )
        .unwrap();

        assert_eq!(draft.description, DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let draft =
            TransactionDraft::new(10.0, TransactionType::Income, work_category(), "pay", None)
                .unwrap();

        assert_eq!(draft.date, OffsetDateTime::now_utc().date());
    }

    #[test]
    fn parse_amount_accepts_positive_numbers() {
        assert_eq!(parse_amount(" 50.25 "), Ok(50.25));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        for raw in ["", "abc", "-3", "0"] {
            assert!(
                matches!(parse_amount(raw), Err(Error::InvalidAmount(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
