//! Flat-file backup of transactions as newline-delimited JSON.
//!
//! Each line is one object with the fields `amount`, `type`, `date`,
//! `category`, and `description`. The same format doubles as a seeding
//! source: a fresh database can be populated from a backup file produced by
//! an earlier installation.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{Category, TransactionType},
    transaction::{
        TransactionDraft, count_all_transactions, create_transaction,
        list_transactions_for_report,
    },
    user::UserID,
};

/// One line of a backup file.
///
/// IDs and owners are deliberately absent: a backup is portable between
/// databases and is re-owned on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Whether the transaction is income or spending.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// When the transaction happened.
    pub date: Date,
    /// The category the transaction belongs to.
    pub category: Category,
    /// A text description of what the transaction was for.
    pub description: String,
}

/// Write all of `owner`'s transactions to `path` as NDJSON, in chronological
/// order, and return how many lines were written.
///
/// An existing file at `path` is rotated to `<path>.bak` first, so one
/// previous backup always survives a bad export.
///
/// # Errors
/// This function will return a:
/// - [Error::BackupIo] if the file cannot be rotated or written,
/// - or [Error::SqlError] if there is an SQL error.
pub fn export_backup(path: &Path, owner: UserID, connection: &Connection) -> Result<u64, Error> {
    let transactions = list_transactions_for_report(owner, connection)?;

    if path.exists() {
        let rotated = path.with_extension(rotated_extension(path));
        fs::rename(path, &rotated).map_err(|error| {
            Error::BackupIo(format!(
                "could not rotate {} to {}: {error}",
                path.display(),
                rotated.display()
            ))
        })?;
    }

    let file = File::create(path)
        .map_err(|error| Error::BackupIo(format!("could not create {}: {error}", path.display())))?;
    let mut writer = BufWriter::new(file);

    for transaction in &transactions {
        let record = BackupRecord {
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            date: transaction.date,
            category: transaction.category.clone(),
            description: transaction.description.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|error| Error::BackupIo(format!("could not serialize record: {error}")))?;

        writeln!(writer, "{line}")
            .map_err(|error| Error::BackupIo(format!("could not write backup line: {error}")))?;
    }

    writer
        .flush()
        .map_err(|error| Error::BackupIo(format!("could not flush backup file: {error}")))?;

    Ok(transactions.len() as u64)
}

fn rotated_extension(path: &Path) -> String {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) => format!("{extension}.bak"),
        None => String::from("bak"),
    }
}

/// Populate an empty database from the backup file at `path`, assigning every
/// imported transaction to `owner`, and return how many rows were inserted.
///
/// Seeding is skipped (returning 0) when the database already contains any
/// transactions or when `path` does not exist. Blank lines are ignored and
/// lines that fail to parse or validate are skipped with a warning, so one
/// corrupt line does not abort the import. The inserts run inside a single
/// database transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::BackupIo] if the file exists but cannot be read,
/// - or [Error::SqlError] if there is an SQL error.
pub fn seed_from_backup(path: &Path, owner: UserID, connection: &Connection) -> Result<u64, Error> {
    if count_all_transactions(connection)? > 0 {
        tracing::debug!("skipping seeding, the database already has transactions");
        return Ok(0);
    }

    if !path.exists() {
        tracing::debug!("skipping seeding, no backup file at {}", path.display());
        return Ok(0);
    }

    let contents = fs::read_to_string(path)
        .map_err(|error| Error::BackupIo(format!("could not read {}: {error}", path.display())))?;

    let sql_transaction = connection.unchecked_transaction()?;
    let mut inserted = 0;

    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let draft = match parse_backup_line(line) {
            Ok(draft) => draft,
            Err(error) => {
                tracing::warn!(
                    "skipping line {} of {}: {error}",
                    line_number + 1,
                    path.display()
                );
                continue;
            }
        };

        create_transaction(draft, owner, &sql_transaction)?;
        inserted += 1;
    }

    sql_transaction.commit()?;

    Ok(inserted)
}

fn parse_backup_line(line: &str) -> Result<TransactionDraft, Error> {
    let record: BackupRecord = serde_json::from_str(line)
        .map_err(|error| Error::BackupIo(format!("malformed backup line: {error}")))?;

    // Re-validate the category against the type: the record's category field
    // deserializes without a membership check.
    let category = Category::new(record.category.as_str(), record.transaction_type)?;

    TransactionDraft::new(
        record.amount,
        record.transaction_type,
        category,
        &record.description,
        Some(record.date),
    )
}
