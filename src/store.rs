use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{DailyAggregate, Transaction, TransactionKind};

/// Hard cap on records touched by one atomic commit. Batch operations must
/// split their work into units no larger than this.
pub const MAX_UNIT_RECORDS: usize = 500;

/// Default page size for transaction listings.
pub const DEFAULT_PAGE_LIMIT: usize = 5;

/// Handle passed to an atomic closure. All reads must happen before the
/// first write within one unit; the whole unit commits or nothing does.
pub trait UnitOfWork {
    fn read_transaction(&mut self, id: &str) -> Result<Option<Transaction>>;
    fn read_aggregate(&mut self, date: NaiveDate) -> Result<Option<DailyAggregate>>;

    fn write_transaction(&mut self, txn: &Transaction) -> Result<()>;
    fn delete_transaction(&mut self, id: &str) -> Result<()>;
    fn write_aggregate(&mut self, agg: &DailyAggregate) -> Result<()>;
    fn delete_aggregate(&mut self, date: NaiveDate) -> Result<()>;
}

/// Filtered, cursor-paginated listing request. `after_id` continues a prior
/// page from the last transaction id it returned.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub limit: usize,
    pub after_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Cursor for the next page; present only when `has_more`.
    pub last_id: Option<String>,
    pub has_more: bool,
}

/// Backing store for one ledger. Every method is scoped to a single user
/// partition; no cross-user visibility.
///
/// `run_atomic` is the store's transaction primitive: the closure observes an
/// isolated snapshot and its writes commit all-or-nothing. A conflicting
/// concurrent writer causes a transparent retry (hence `FnMut`); when the
/// retry budget is exhausted the operation fails with `Conflict`.
pub trait Store {
    fn run_atomic<T, F>(&self, user_id: &str, op: F) -> Result<T>
    where
        F: FnMut(&mut dyn UnitOfWork) -> Result<T>;

    fn get_transaction(&self, user_id: &str, id: &str) -> Result<Option<Transaction>>;
    fn transactions_page(&self, user_id: &str, query: &TransactionQuery) -> Result<TransactionPage>;
    fn transaction_ids_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>>;

    fn get_aggregate(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyAggregate>>;
    fn aggregates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAggregate>>;
    fn aggregate_dates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>>;
}

impl TransactionQuery {
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        TransactionQuery {
            start,
            end,
            kind: None,
            category: None,
            limit: DEFAULT_PAGE_LIMIT,
            after_id: None,
        }
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if txn.date < self.start || txn.date > self.end {
            return false;
        }
        if let Some(kind) = self.kind {
            if txn.kind != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &txn.category != category {
                return false;
            }
        }
        true
    }
}
