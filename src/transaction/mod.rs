//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionDraft` for validated input
//! - Owner-scoped database functions for creating, fetching, updating, and
//!   deleting transactions
//! - The filtered, paginated query builder used by the listing endpoints

mod core;
mod query;

pub use self::core::{
    Transaction, TransactionDraft, TransactionId, count_all_transactions, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, map_transaction_row,
    parse_amount, update_transaction,
};
pub use self::query::{
    TransactionFilter, count_transactions, list_transactions_for_report, query_transactions,
};

#[cfg(test)]
pub(crate) use self::core::test_utils;
