//! The transaction type enum and the closed category sets that go with it.
//!
//! The category sets are process-wide constants: users cannot add, rename, or
//! remove categories.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Whether a transaction records money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Spending,
}

impl TransactionType {
    /// The string stored in the database and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Spending => "spending",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "spending" => Ok(TransactionType::Spending),
            _ => Err(Error::InvalidTransactionType(s.to_string())),
        }
    }
}

/// The categories an income transaction may use.
pub const INCOME_CATEGORIES: [&str; 5] = ["work", "financial_aid", "family", "sell", "other"];

/// The categories a spending transaction may use.
pub const SPENDING_CATEGORIES: [&str; 15] = [
    "transportation",
    "personal_care",
    "groceries",
    "eating_out",
    "travel",
    "shopping",
    "app_subscriptions",
    "education",
    "utilities",
    "rent",
    "cellphone",
    "hobbies",
    "fitness",
    "medical",
    "other",
];

/// The category set for `transaction_type`.
pub fn categories_for(transaction_type: TransactionType) -> &'static [&'static str] {
    match transaction_type {
        TransactionType::Income => &INCOME_CATEGORIES,
        TransactionType::Spending => &SPENDING_CATEGORIES,
    }
}

/// A category name that has been checked against the category set for its
/// transaction type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Create a category, validating that `name` (case-insensitively) belongs
    /// to the category set for `transaction_type`.
    ///
    /// # Errors
    /// Returns [Error::InvalidCategory] if `name` is not in the set.
    pub fn new(name: &str, transaction_type: TransactionType) -> Result<Self, Error> {
        let name = name.trim().to_lowercase();

        if categories_for(transaction_type).contains(&name.as_str()) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidCategory {
                category: name,
                transaction_type: transaction_type.to_string(),
            })
        }
    }

    /// Create a category without any validation.
    ///
    /// The caller should ensure that `name` belongs to one of the category
    /// sets, e.g. when reading a row that was validated on insertion.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The category name as stored in the database.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}


#[cfg(test)]
mod category_tests {
    use crate::Error;

    use super::{Category, TransactionType};

    #[test]
    fn accepts_category_matching_type() {
        let category = Category::new("work", TransactionType::Income).unwrap();

        assert_eq!(category.as_str(), "work");
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let category = Category::new(" Groceries ", TransactionType::Spending).unwrap();

        assert_eq!(category.as_str(), "groceries");
    }

    #[test]
    fn rejects_category_from_other_set() {
        // "rent" is a spending category, not an income category.
        let result = Category::new("rent", TransactionType::Income);

        assert_eq!(
            result,
            Err(Error::InvalidCategory {
                category: "rent".to_string(),
                transaction_type: "income".to_string(),
            })
        );
    }

    #[test]
    fn other_is_valid_for_both_types() {
        assert!(Category::new("other", TransactionType::Income).is_ok());
        assert!(Category::new("other", TransactionType::Spending).is_ok());
    }
}
