use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{TransactionKind, EXPENSE_CATEGORIES, INCOME_CATEGORIES};
use crate::store::{Store, TransactionPage, TransactionQuery};

/// Date window plus optional narrowing for summaries, listings and exports.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
}

impl RangeFilter {
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(LedgerError::Validation(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if let Some(category) = &self.category {
            let known = match self.kind {
                Some(kind) => kind.vocabulary().contains(&category.as_str()),
                None => {
                    EXPENSE_CATEGORIES.contains(&category.as_str())
                        || INCOME_CATEGORIES.contains(&category.as_str())
                }
            };
            if !known {
                return Err(LedgerError::Validation(match self.kind {
                    Some(kind) => {
                        format!("unknown category '{}' for type {}", category, kind.as_str())
                    }
                    None => format!("unknown category '{category}'"),
                }));
            }
        }
        Ok(())
    }
}

/// Folded totals over a date range, shaped like a daily aggregate: both
/// breakdown maps always carry the full vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSummary {
    pub total_expense: Decimal,
    pub total_income: Decimal,
    pub expense_by_category: BTreeMap<String, Decimal>,
    pub income_by_category: BTreeMap<String, Decimal>,
    /// Days folded into this summary.
    pub days: usize,
}

fn zeroed(vocabulary: &[&str]) -> BTreeMap<String, Decimal> {
    vocabulary
        .iter()
        .map(|cat| (cat.to_string(), Decimal::ZERO))
        .collect()
}

fn add_map(acc: &mut BTreeMap<String, Decimal>, day: &BTreeMap<String, Decimal>) {
    for (category, amount) in day {
        *acc.entry(category.clone()).or_insert(Decimal::ZERO) += *amount;
    }
}

fn bucket(map: &BTreeMap<String, Decimal>, category: &str) -> Decimal {
    map.get(category).copied().unwrap_or(Decimal::ZERO)
}

impl RangeSummary {
    fn zeroed() -> Self {
        RangeSummary {
            total_expense: Decimal::ZERO,
            total_income: Decimal::ZERO,
            expense_by_category: zeroed(EXPENSE_CATEGORIES),
            income_by_category: zeroed(INCOME_CATEGORIES),
            days: 0,
        }
    }
}

/// Fold the daily aggregates in range into one summary, without touching the
/// transaction store.
///
/// Filter composition is inherited behavior, preserved exactly: a category
/// filter narrows the top-level total to that category's sum, while the
/// breakdown maps keep the full per-category sums of every map folded.
pub fn summarize_range<S: Store>(
    store: &S,
    user_id: &str,
    filter: &RangeFilter,
) -> Result<RangeSummary> {
    filter.validate()?;
    let days = store.aggregates_in_range(user_id, filter.start, filter.end)?;

    let mut acc = RangeSummary::zeroed();
    acc.days = days.len();
    for day in &days {
        match filter.kind {
            None => {
                add_map(&mut acc.expense_by_category, &day.expense_by_category);
                add_map(&mut acc.income_by_category, &day.income_by_category);
                match &filter.category {
                    None => {
                        acc.total_expense += day.total_expense;
                        acc.total_income += day.total_income;
                    }
                    // The vocabularies are disjoint, so the category narrows
                    // exactly one of the two totals; the other accumulates
                    // wholesale.
                    Some(category) if EXPENSE_CATEGORIES.contains(&category.as_str()) => {
                        acc.total_expense += bucket(&day.expense_by_category, category);
                        acc.total_income += day.total_income;
                    }
                    Some(category) => {
                        acc.total_income += bucket(&day.income_by_category, category);
                        acc.total_expense += day.total_expense;
                    }
                }
            }
            Some(TransactionKind::Expense) => {
                add_map(&mut acc.expense_by_category, &day.expense_by_category);
                acc.total_expense += match &filter.category {
                    None => day.total_expense,
                    Some(category) => bucket(&day.expense_by_category, category),
                };
            }
            Some(TransactionKind::Income) => {
                add_map(&mut acc.income_by_category, &day.income_by_category);
                acc.total_income += match &filter.category {
                    None => day.total_income,
                    Some(category) => bucket(&day.income_by_category, category),
                };
            }
        }
    }
    Ok(acc)
}

/// Most-recent-first page of matching transactions. A plain filtered read of
/// the transaction store; independent of the aggregate fold.
pub fn list_page<S: Store>(
    store: &S,
    user_id: &str,
    filter: &RangeFilter,
    limit: usize,
    after_id: Option<String>,
) -> Result<TransactionPage> {
    filter.validate()?;
    if limit == 0 {
        return Err(LedgerError::Validation(
            "page limit must be at least 1".to_string(),
        ));
    }
    let query = TransactionQuery {
        start: filter.start,
        end: filter.end,
        kind: filter.kind,
        category: filter.category.clone(),
        limit,
        after_id,
    };
    store.transactions_page(user_id, &query)
}
