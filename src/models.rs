use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};

pub const EXPENSE_CATEGORIES: &[&str] = &["food", "shopping", "health", "other"];
pub const INCOME_CATEGORIES: &[&str] = &["salary", "gift", "investment", "bonus"];

/// The single currency code in scope.
pub const CURRENCY: &str = "THB";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(LedgerError::Validation(format!(
                "unknown transaction type '{raw}' (expected Income or Expense)"
            ))),
        }
    }

    /// The closed category vocabulary for this kind.
    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self {
            TransactionKind::Income => INCOME_CATEGORIES,
            TransactionKind::Expense => EXPENSE_CATEGORIES,
        }
    }
}

/// Parse a calendar day in the exact wire format YYYY-MM-DD.
/// Anything else is a caller error, never silently coerced.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
    if !re.is_match(raw) {
        return Err(LedgerError::Validation(format!(
            "invalid date '{raw}' (use YYYY-MM-DD)"
        )));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| LedgerError::Validation(format!("'{raw}' is not a real calendar date")))
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_category(kind: TransactionKind, category: &str) -> Result<()> {
    if !kind.vocabulary().contains(&category) {
        return Err(LedgerError::Validation(format!(
            "unknown category '{}' for type {}",
            category,
            kind.as_str()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub currency: String,
}

impl Transaction {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        validate_category(self.kind, &self.category)
    }

    /// Merge an edit into a copy of this record. The result must be
    /// re-validated before it is written.
    pub fn with_patch(&self, patch: &TransactionPatch) -> Transaction {
        let mut merged = self.clone();
        if let Some(kind) = patch.kind {
            merged.kind = kind;
        }
        if let Some(category) = &patch.category {
            merged.category = category.clone();
        }
        if let Some(date) = patch.date {
            merged.date = date;
        }
        if let Some(amount) = patch.amount {
            merged.amount = amount;
        }
        if let Some(description) = &patch.description {
            merged.description = description.clone();
        }
        merged
    }
}

/// A transaction as submitted by the user, before an id is assigned.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

impl TransactionDraft {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        validate_category(self.kind, &self.category)
    }
}

/// Fields an edit may change. Absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.amount.is_none()
            && self.description.is_none()
    }
}

/// Precomputed totals for one (user, calendar day). Kept consistent with the
/// transaction log by the ledger; never written by any other path.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_expense: Decimal,
    pub total_income: Decimal,
    pub expense_by_category: BTreeMap<String, Decimal>,
    pub income_by_category: BTreeMap<String, Decimal>,
    /// Unix milliseconds of the last mutation that touched this day.
    pub last_updated: i64,
}

fn zeroed_buckets(vocabulary: &[&str]) -> BTreeMap<String, Decimal> {
    vocabulary
        .iter()
        .map(|cat| (cat.to_string(), Decimal::ZERO))
        .collect()
}

impl DailyAggregate {
    /// A fresh all-zero day with the full category vocabulary present.
    pub fn empty(date: NaiveDate) -> Self {
        DailyAggregate {
            date,
            total_expense: Decimal::ZERO,
            total_income: Decimal::ZERO,
            expense_by_category: zeroed_buckets(EXPENSE_CATEGORIES),
            income_by_category: zeroed_buckets(INCOME_CATEGORIES),
            last_updated: 0,
        }
    }

    fn bucket_mut(
        &mut self,
        kind: TransactionKind,
    ) -> (&mut Decimal, &mut BTreeMap<String, Decimal>) {
        match kind {
            TransactionKind::Expense => (&mut self.total_expense, &mut self.expense_by_category),
            TransactionKind::Income => (&mut self.total_income, &mut self.income_by_category),
        }
    }

    /// Add a transaction's contribution to the matching total and bucket.
    pub fn credit(&mut self, kind: TransactionKind, category: &str, amount: Decimal) {
        let (total, buckets) = self.bucket_mut(kind);
        *total += amount;
        *buckets.entry(category.to_string()).or_insert(Decimal::ZERO) += amount;
    }

    /// Remove a transaction's contribution, clamping at zero. An aggregate
    /// value is never driven negative; under non-idempotent retries this can
    /// under-report, which is the documented divergence tolerance.
    pub fn debit_clamped(&mut self, kind: TransactionKind, category: &str, amount: Decimal) {
        let (total, buckets) = self.bucket_mut(kind);
        *total = (*total - amount).max(Decimal::ZERO);
        let bucket = buckets.entry(category.to_string()).or_insert(Decimal::ZERO);
        *bucket = (*bucket - amount).max(Decimal::ZERO);
    }

    /// Invariant check: each total equals the sum of its buckets and nothing
    /// is negative.
    pub fn is_consistent(&self) -> bool {
        let expense_sum: Decimal = self.expense_by_category.values().copied().sum();
        let income_sum: Decimal = self.income_by_category.values().copied().sum();
        self.total_expense == expense_sum
            && self.total_income == income_sum
            && self
                .expense_by_category
                .values()
                .chain(self.income_by_category.values())
                .all(|v| *v >= Decimal::ZERO)
    }
}
