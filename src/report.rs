//! The aggregation/reporting engine.
//!
//! Every function takes the owner's transactions in chronological order (as
//! returned by
//! [list_transactions_for_report](crate::transaction::list_transactions_for_report))
//! and accumulates them in a single pass. Sums are kept as full `f64` values;
//! rounding to two decimal places happens only at the display boundary via
//! [round2] or [TypeTotals::rounded].

use std::{collections::BTreeMap, fmt::Display, ops::RangeInclusive, str::FromStr};

use serde::{Serialize, Serializer};
use time::{Date, Month};

use crate::{
    Error,
    category::{Category, TransactionType},
    transaction::Transaction,
};

/// The trailing windows reported by the stats page, in days measured back
/// from today. The windows are independent and overlapping.
pub const TRAILING_WINDOWS: [i64; 4] = [30, 90, 120, 360];

/// Round a sum to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A pair of sums, one per transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TypeTotals {
    /// Total amount earned.
    pub income: f64,
    /// Total amount spent.
    pub spending: f64,
}

impl TypeTotals {
    fn add(&mut self, transaction_type: TransactionType, amount: f64) {
        match transaction_type {
            TransactionType::Income => self.income += amount,
            TransactionType::Spending => self.spending += amount,
        }
    }

    /// A copy with both sums rounded to two decimal places.
    pub fn rounded(self) -> Self {
        Self {
            income: round2(self.income),
            spending: round2(self.spending),
        }
    }
}

/// Sum amounts grouped by type over the whole data set.
pub fn all_time_totals(transactions: &[Transaction]) -> TypeTotals {
    let mut totals = TypeTotals::default();

    for transaction in transactions {
        totals.add(transaction.transaction_type, transaction.amount);
    }

    totals
}

/// The totals for one trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowTotals {
    /// The window length in days.
    pub days: i64,
    /// The sums for transactions inside the window.
    #[serde(flatten)]
    pub totals: TypeTotals,
}

/// Sum amounts by type for each window in [TRAILING_WINDOWS], measured back
/// from `today`.
///
/// The boundary is inclusive: a transaction dated exactly N days before
/// `today` counts toward the N-day window and every longer one. A
/// transaction from 10 days ago therefore counts toward all four windows.
pub fn trailing_window_totals(transactions: &[Transaction], today: Date) -> Vec<WindowTotals> {
    let mut windows: Vec<WindowTotals> = TRAILING_WINDOWS
        .iter()
        .map(|&days| WindowTotals {
            days,
            totals: TypeTotals::default(),
        })
        .collect();

    for transaction in transactions {
        let age_in_days = (today - transaction.date).whole_days();

        for window in &mut windows {
            if age_in_days <= window.days {
                window
                    .totals
                    .add(transaction.transaction_type, transaction.amount);
            }
        }
    }

    windows
}

/// A calendar bucket key: one month of one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    /// The calendar year.
    pub year: i32,
    /// The calendar month.
    pub month: Month,
}

impl YearMonth {
    /// The bucket that `date` falls into.
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The inclusive date range covering this month, for use as a query
    /// filter.
    pub fn date_range(&self) -> RangeInclusive<Date> {
        // Both constructions are infallible: day 1 always exists and the
        // month length is taken from the calendar.
        let start = Date::from_calendar_date(self.year, self.month, 1)
            .expect("the first of the month is always a valid date");
        let end = Date::from_calendar_date(self.year, self.month, self.month.length(self.year))
            .expect("the last day of the month is always a valid date");

        start..=end
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDate(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Nested mapping from year to month (1-12) to the totals for that month.
///
/// Buckets are created lazily: months without transactions do not appear.
pub type CalendarBreakdown = BTreeMap<i32, BTreeMap<u8, TypeTotals>>;

/// Bucket transactions by calendar year and month in one pass.
pub fn calendar_breakdown(transactions: &[Transaction]) -> CalendarBreakdown {
    let mut calendar = CalendarBreakdown::new();

    for transaction in transactions {
        let bucket = calendar
            .entry(transaction.date.year())
            .or_default()
            .entry(transaction.date.month() as u8)
            .or_default();

        bucket.add(transaction.transaction_type, transaction.amount);
    }

    calendar
}

/// The total for one category within a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name.
    pub category: Category,
    /// The summed amount for the category.
    pub total: f64,
}

/// The category breakdown for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCategories {
    /// The month the breakdown covers. `None` only when there is no data at
    /// all and no month was requested.
    pub month: Option<YearMonth>,
    /// Income categories, sorted by descending total.
    pub income: Vec<CategoryTotal>,
    /// Spending categories, sorted by descending total.
    pub spending: Vec<CategoryTotal>,
}

/// Sum amounts per category for a selected month, grouped by type and sorted
/// by descending total (ties broken by category name).
///
/// When `requested` is `None` the most recent month present in the data is
/// used. A requested month with no transactions yields empty lists for both
/// types.
pub fn category_breakdown(
    transactions: &[Transaction],
    requested: Option<YearMonth>,
) -> MonthCategories {
    let month = requested.or_else(|| {
        transactions
            .iter()
            .map(|transaction| YearMonth::of(transaction.date))
            .max()
    });

    let Some(month) = month else {
        return MonthCategories {
            month: None,
            income: Vec::new(),
            spending: Vec::new(),
        };
    };

    let mut income: BTreeMap<Category, f64> = BTreeMap::new();
    let mut spending: BTreeMap<Category, f64> = BTreeMap::new();

    for transaction in transactions {
        if YearMonth::of(transaction.date) != month {
            continue;
        }

        let totals = match transaction.transaction_type {
            TransactionType::Income => &mut income,
            TransactionType::Spending => &mut spending,
        };
        *totals.entry(transaction.category.clone()).or_default() += transaction.amount;
    }

    MonthCategories {
        month: Some(month),
        income: sorted_category_totals(income),
        spending: sorted_category_totals(spending),
    }
}

fn sorted_category_totals(totals: BTreeMap<Category, f64>) -> Vec<CategoryTotal> {
    let mut category_totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();

    category_totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });

    category_totals
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use time::{Date, Duration, Month, macros::date};

    use crate::{
        category::{Category, TransactionType},
        transaction::Transaction,
        user::UserID,
    };

    use super::{
        CategoryTotal, MonthCategories, TRAILING_WINDOWS, YearMonth, all_time_totals,
        calendar_breakdown, category_breakdown, round2, trailing_window_totals,
    };

    fn transaction(
        amount: f64,
        transaction_type: TransactionType,
        category: &str,
        date: Date,
    ) -> Transaction {
        Transaction {
            id: 0,
            amount,
            transaction_type,
            category: Category::new_unchecked(category),
            description: String::new(),
            date,
            user_id: UserID::new(1),
        }
    }

    #[test]
    fn all_time_totals_sums_by_type() {
        let transactions = vec![
            transaction(100.0, TransactionType::Income, "work", date!(2024 - 01 - 15)),
            transaction(25.5, TransactionType::Spending, "groceries", date!(2024 - 01 - 20)),
            transaction(50.0, TransactionType::Income, "sell", date!(2024 - 02 - 01)),
        ];

        let totals = all_time_totals(&transactions);

        assert_eq!(totals.income, 150.0);
        assert_eq!(totals.spending, 25.5);
    }

    #[test]
    fn empty_input_yields_zero_totals_and_empty_calendar() {
        let totals = all_time_totals(&[]);
        assert_eq!(totals.income, 0.0);
        assert_eq!(totals.spending, 0.0);

        assert!(calendar_breakdown(&[]).is_empty());

        let windows = trailing_window_totals(&[], date!(2024 - 06 - 01));
        assert!(windows.iter().all(|window| window.totals.income == 0.0
            && window.totals.spending == 0.0));
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let today = date!(2024 - 06 - 01);
        // Dated exactly 90 days before today.
        let transactions = vec![transaction(
            10.0,
            TransactionType::Spending,
            "rent",
            today - Duration::days(90),
        )];

        let windows = trailing_window_totals(&transactions, today);

        for window in windows {
            let want = if window.days >= 90 { 10.0 } else { 0.0 };
            assert_eq!(
                window.totals.spending, want,
                "window of {} days should have spending {want}",
                window.days
            );
        }
    }

    #[test]
    fn recent_transaction_counts_toward_all_windows() {
        let today = date!(2024 - 06 - 01);
        let transactions = vec![transaction(
            5.0,
            TransactionType::Income,
            "work",
            today - Duration::days(10),
        )];

        let windows = trailing_window_totals(&transactions, today);

        assert_eq!(windows.len(), TRAILING_WINDOWS.len());
        assert!(windows.iter().all(|window| window.totals.income == 5.0));
    }

    #[test]
    fn example_income_within_360_days() {
        let transactions = vec![transaction(
            50.0,
            TransactionType::Income,
            "work",
            date!(2024 - 01 - 15),
        )];

        let windows = trailing_window_totals(&transactions, date!(2024 - 06 - 01));

        let window_360 = windows.iter().find(|window| window.days == 360).unwrap();
        assert!(window_360.totals.income >= 50.0);
    }

    #[test]
    fn calendar_months_sum_to_year_total() {
        let transactions = vec![
            transaction(100.0, TransactionType::Income, "work", date!(2024 - 01 - 15)),
            transaction(200.0, TransactionType::Income, "work", date!(2024 - 03 - 10)),
            transaction(40.0, TransactionType::Spending, "rent", date!(2024 - 03 - 12)),
            transaction(60.0, TransactionType::Spending, "rent", date!(2024 - 11 - 30)),
        ];

        let calendar = calendar_breakdown(&transactions);
        let all_time = all_time_totals(&transactions);

        let year = calendar.get(&2024).unwrap();
        let income_sum: f64 = year.values().map(|totals| totals.income).sum();
        let spending_sum: f64 = year.values().map(|totals| totals.spending).sum();

        assert_eq!(income_sum, all_time.income);
        assert_eq!(spending_sum, all_time.spending);
    }

    #[test]
    fn calendar_buckets_are_created_lazily() {
        let transactions = vec![transaction(
            100.0,
            TransactionType::Income,
            "work",
            date!(2023 - 12 - 31),
        )];

        let calendar = calendar_breakdown(&transactions);

        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[&2023].len(), 1);
        assert_eq!(calendar[&2023][&12].income, 100.0);
    }

    #[test]
    fn category_breakdown_sorts_by_descending_total() {
        let transactions = vec![
            transaction(10.0, TransactionType::Spending, "groceries", date!(2024 - 05 - 01)),
            transaction(50.0, TransactionType::Spending, "rent", date!(2024 - 05 - 02)),
            transaction(10.0, TransactionType::Spending, "groceries", date!(2024 - 05 - 03)),
            transaction(80.0, TransactionType::Income, "work", date!(2024 - 05 - 04)),
        ];

        let breakdown = category_breakdown(
            &transactions,
            Some(YearMonth {
                year: 2024,
                month: Month::May,
            }),
        );

        assert_eq!(
            breakdown.spending,
            vec![
                CategoryTotal {
                    category: Category::new_unchecked("rent"),
                    total: 50.0
                },
                CategoryTotal {
                    category: Category::new_unchecked("groceries"),
                    total: 20.0
                },
            ]
        );
        assert_eq!(breakdown.income.len(), 1);
    }

    #[test]
    fn category_breakdown_defaults_to_most_recent_month() {
        let transactions = vec![
            transaction(10.0, TransactionType::Spending, "rent", date!(2024 - 03 - 01)),
            transaction(20.0, TransactionType::Spending, "rent", date!(2024 - 05 - 01)),
        ];

        let breakdown = category_breakdown(&transactions, None);

        assert_eq!(
            breakdown.month,
            Some(YearMonth {
                year: 2024,
                month: Month::May
            })
        );
        assert_eq!(breakdown.spending[0].total, 20.0);
    }

    #[test]
    fn category_breakdown_for_empty_month_is_empty_for_both_types() {
        let transactions = vec![transaction(
            10.0,
            TransactionType::Spending,
            "rent",
            date!(2024 - 03 - 01),
        )];

        let breakdown = category_breakdown(
            &transactions,
            Some(YearMonth {
                year: 2024,
                month: Month::April,
            }),
        );

        assert!(breakdown.income.is_empty());
        assert!(breakdown.spending.is_empty());
    }

    #[test]
    fn category_breakdown_of_no_data_has_no_month() {
        let breakdown = category_breakdown(&[], None);

        assert_eq!(
            breakdown,
            MonthCategories {
                month: None,
                income: Vec::new(),
                spending: Vec::new()
            }
        );
    }

    #[test]
    fn year_month_parses_and_formats() {
        let parsed = YearMonth::from_str("2024-05").unwrap();

        assert_eq!(
            parsed,
            YearMonth {
                year: 2024,
                month: Month::May
            }
        );
        assert_eq!(parsed.to_string(), "2024-05");
    }

    #[test]
    fn year_month_rejects_garbage() {
        for raw in ["2024", "2024-13", "05-2024", "foo-bar"] {
            assert!(YearMonth::from_str(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn year_month_date_range_covers_whole_month() {
        let month = YearMonth {
            year: 2024,
            month: Month::February,
        };

        let range = month.date_range();

        assert_eq!(*range.start(), date!(2024 - 02 - 01));
        // 2024 is a leap year.
        assert_eq!(*range.end(), date!(2024 - 02 - 29));
    }

    #[test]
    fn round2_rounds_to_two_decimal_places() {
        assert_eq!(round2(10.006), 10.01);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(0.1 + 0.2), 0.3);
    }
}
