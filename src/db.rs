//! Database initialization.
//!
//! The schema is created by an explicit startup step instead of being checked
//! lazily on every request: call [initialize] once before serving or before
//! the first CLI command.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, transaction::create_transaction_table, user::create_user_table};

/// Create the tables for the application's domain models if they do not exist.
///
/// Also enables foreign key enforcement for `connection`, which SQLite turns
/// off by default. This is required for the user -> transaction delete
/// cascade.
///
/// # Errors
/// Returns an error if a table could not be created or there was an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
