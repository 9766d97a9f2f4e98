use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::models::{DailyAggregate, Transaction, TransactionDraft, TransactionPatch, CURRENCY};
use crate::store::{Store, UnitOfWork, MAX_UNIT_RECORDS};

/// The aggregation engine. Every mutation applies the transaction record and
/// the affected daily aggregate(s) in one atomic unit, so no reader ever
/// observes the log and the summary out of step.
pub struct Ledger<S: Store> {
    store: S,
}

/// Outcome of a range purge. Batches commit independently, so a failure
/// partway through reports what already went through rather than pretending
/// to roll back.
#[derive(Debug)]
pub struct PurgeReport {
    /// Records removed across all committed batches (transactions and
    /// aggregates both count).
    pub deleted: usize,
    pub completed: bool,
    pub error: Option<LedgerError>,
}

enum PurgeRef {
    Txn(String),
    Day(NaiveDate),
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S) -> Self {
        Ledger { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a new transaction and fold it into its day's aggregate.
    /// Returns the assigned id.
    pub fn insert(&self, user_id: &str, draft: TransactionDraft) -> Result<String> {
        draft.validate()?;
        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: draft.kind,
            category: draft.category,
            date: draft.date,
            amount: draft.amount,
            description: draft.description,
            currency: CURRENCY.to_string(),
        };

        self.store.run_atomic(user_id, |unit| {
            let mut agg = unit
                .read_aggregate(txn.date)?
                .unwrap_or_else(|| DailyAggregate::empty(txn.date));
            agg.credit(txn.kind, &txn.category, txn.amount);
            agg.last_updated = now_millis();
            unit.write_transaction(&txn)?;
            unit.write_aggregate(&agg)?;
            Ok(())
        })?;

        Ok(txn.id)
    }

    /// Edit an existing transaction. Any field may change; a date change
    /// moves the contribution between two aggregates, conserving the total
    /// across both documents.
    pub fn update(&self, user_id: &str, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        self.store.run_atomic(user_id, |unit| {
            let old = unit
                .read_transaction(id)?
                .ok_or_else(|| LedgerError::NotFound(format!("no transaction with id {id}")))?;
            let updated = old.with_patch(patch);
            updated.validate()?;

            // All reads happen before the first write.
            let mut old_agg = unit
                .read_aggregate(old.date)?
                .unwrap_or_else(|| DailyAggregate::empty(old.date));
            let same_date = updated.date == old.date;
            let mut new_agg = if same_date {
                None
            } else {
                Some(
                    unit.read_aggregate(updated.date)?
                        .unwrap_or_else(|| DailyAggregate::empty(updated.date)),
                )
            };

            let stamp = now_millis();
            old_agg.debit_clamped(old.kind, &old.category, old.amount);
            old_agg.last_updated = stamp;
            match new_agg.as_mut() {
                // Same day: one aggregate document absorbs both steps.
                None => old_agg.credit(updated.kind, &updated.category, updated.amount),
                Some(agg) => {
                    agg.credit(updated.kind, &updated.category, updated.amount);
                    agg.last_updated = stamp;
                }
            }

            unit.write_transaction(&updated)?;
            unit.write_aggregate(&old_agg)?;
            if let Some(agg) = &new_agg {
                unit.write_aggregate(agg)?;
            }
            Ok(updated)
        })
    }

    /// Remove a transaction and subtract its contribution from its day.
    pub fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        self.store.run_atomic(user_id, |unit| {
            let txn = unit
                .read_transaction(id)?
                .ok_or_else(|| LedgerError::NotFound(format!("no transaction with id {id}")))?;
            let mut agg = unit
                .read_aggregate(txn.date)?
                .unwrap_or_else(|| DailyAggregate::empty(txn.date));
            agg.debit_clamped(txn.kind, &txn.category, txn.amount);
            agg.last_updated = now_millis();
            unit.delete_transaction(id)?;
            unit.write_aggregate(&agg)?;
            Ok(())
        })
    }

    /// Delete every transaction AND every daily aggregate dated within
    /// [start, end]. Aggregates are removed wholesale, not recomputed: the
    /// whole day's contributing transactions go with them, so nothing
    /// residual survives.
    ///
    /// Work is committed in batches of at most `MAX_UNIT_RECORDS`; the report
    /// carries the count that actually committed. An empty range is a
    /// successful zero-count purge.
    pub fn purge_range(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<PurgeReport> {
        if start > end {
            return Err(LedgerError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let mut refs: Vec<PurgeRef> = self
            .store
            .transaction_ids_in_range(user_id, start, end)?
            .into_iter()
            .map(PurgeRef::Txn)
            .collect();
        refs.extend(
            self.store
                .aggregate_dates_in_range(user_id, start, end)?
                .into_iter()
                .map(PurgeRef::Day),
        );

        let mut deleted = 0;
        for batch in refs.chunks(MAX_UNIT_RECORDS) {
            let committed = self.store.run_atomic(user_id, |unit| {
                for r in batch {
                    match r {
                        PurgeRef::Txn(id) => unit.delete_transaction(id)?,
                        PurgeRef::Day(date) => unit.delete_aggregate(*date)?,
                    }
                }
                Ok(())
            });
            match committed {
                Ok(()) => deleted += batch.len(),
                Err(e) => {
                    return Ok(PurgeReport {
                        deleted,
                        completed: false,
                        error: Some(e),
                    })
                }
            }
        }

        Ok(PurgeReport {
            deleted,
            completed: true,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::memstore::MemoryStore;
    use crate::models::{parse_date, TransactionKind};

    const USER: &str = "u1";

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new())
    }

    fn expense(category: &str, date: &str, amount: i64) -> TransactionDraft {
        TransactionDraft {
            kind: TransactionKind::Expense,
            category: category.to_string(),
            date: parse_date(date).unwrap(),
            amount: Decimal::new(amount, 0),
            description: String::new(),
        }
    }

    fn income(category: &str, date: &str, amount: i64) -> TransactionDraft {
        TransactionDraft {
            kind: TransactionKind::Income,
            category: category.to_string(),
            date: parse_date(date).unwrap(),
            amount: Decimal::new(amount, 0),
            description: String::new(),
        }
    }

    fn agg(ledger: &Ledger<MemoryStore>, date: &str) -> DailyAggregate {
        ledger
            .store()
            .get_aggregate(USER, parse_date(date).unwrap())
            .unwrap()
            .expect("aggregate present")
    }

    #[test]
    fn test_insert_creates_day_lazily_and_credits_bucket() {
        let ledger = ledger();
        ledger.insert(USER, expense("food", "2024-03-01", 100)).unwrap();

        let day = agg(&ledger, "2024-03-01");
        assert_eq!(day.total_expense, Decimal::new(100, 0));
        assert_eq!(day.expense_by_category["food"], Decimal::new(100, 0));
        assert_eq!(day.total_income, Decimal::ZERO);
        assert!(day.is_consistent());
        assert!(day.last_updated > 0);
    }

    #[test]
    fn test_insert_rejects_invalid_draft_before_any_write() {
        let ledger = ledger();
        let err = ledger.insert(USER, expense("salary", "2024-03-01", 100)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(ledger
            .store()
            .get_aggregate(USER, parse_date("2024-03-01").unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_running_total_tracks_insert_update_insert_delete() {
        let ledger = ledger();
        let first = ledger.insert(USER, expense("food", "2024-03-01", 100)).unwrap();
        assert_eq!(agg(&ledger, "2024-03-01").total_expense, Decimal::new(100, 0));

        let patch = TransactionPatch {
            amount: Some(Decimal::new(40, 0)),
            ..Default::default()
        };
        ledger.update(USER, &first, &patch).unwrap();
        let day = agg(&ledger, "2024-03-01");
        assert_eq!(day.total_expense, Decimal::new(40, 0));
        assert_eq!(day.expense_by_category["food"], Decimal::new(40, 0));

        let second = ledger.insert(USER, expense("food", "2024-03-01", 60)).unwrap();
        assert_eq!(agg(&ledger, "2024-03-01").total_expense, Decimal::new(100, 0));

        ledger.delete(USER, &second).unwrap();
        let day = agg(&ledger, "2024-03-01");
        assert_eq!(day.total_expense, Decimal::new(40, 0));
        assert!(day.is_consistent());
    }

    #[test]
    fn test_update_across_dates_moves_contribution_exactly() {
        let ledger = ledger();
        let id = ledger.insert(USER, expense("health", "2024-03-01", 75)).unwrap();

        let patch = TransactionPatch {
            date: Some(parse_date("2024-03-05").unwrap()),
            amount: Some(Decimal::new(90, 0)),
            ..Default::default()
        };
        ledger.update(USER, &id, &patch).unwrap();

        let old_day = agg(&ledger, "2024-03-01");
        let new_day = agg(&ledger, "2024-03-05");
        assert_eq!(old_day.total_expense, Decimal::ZERO);
        assert_eq!(old_day.expense_by_category["health"], Decimal::ZERO);
        assert_eq!(new_day.total_expense, Decimal::new(90, 0));
        assert_eq!(new_day.expense_by_category["health"], Decimal::new(90, 0));
        assert!(old_day.is_consistent() && new_day.is_consistent());
    }

    #[test]
    fn test_update_can_flip_kind_between_buckets() {
        let ledger = ledger();
        let id = ledger.insert(USER, expense("other", "2024-03-01", 30)).unwrap();

        let patch = TransactionPatch {
            kind: Some(TransactionKind::Income),
            category: Some("gift".to_string()),
            ..Default::default()
        };
        ledger.update(USER, &id, &patch).unwrap();

        let day = agg(&ledger, "2024-03-01");
        assert_eq!(day.total_expense, Decimal::ZERO);
        assert_eq!(day.total_income, Decimal::new(30, 0));
        assert_eq!(day.income_by_category["gift"], Decimal::new(30, 0));
    }

    #[test]
    fn test_update_rejects_merged_record_that_breaks_invariants() {
        let ledger = ledger();
        let id = ledger.insert(USER, expense("food", "2024-03-01", 100)).unwrap();

        // Kind flip without a category move lands "food" in the income
        // vocabulary, which must be rejected with no aggregate change.
        let patch = TransactionPatch {
            kind: Some(TransactionKind::Income),
            ..Default::default()
        };
        let err = ledger.update(USER, &id, &patch).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(agg(&ledger, "2024-03-01").total_expense, Decimal::new(100, 0));
    }

    #[test]
    fn test_update_missing_transaction_is_not_found() {
        let ledger = ledger();
        let err = ledger
            .update(USER, "nope", &TransactionPatch::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn test_delete_missing_transaction_is_not_found() {
        let ledger = ledger();
        let err = ledger.delete(USER, "nope").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn test_aggregate_is_never_driven_negative() {
        let ledger = ledger();
        let id = ledger.insert(USER, income("salary", "2024-03-01", 100)).unwrap();

        // Simulate a drifted day document holding less than the recorded
        // amount; the delete's subtraction clamps at zero instead of going
        // negative.
        let date = parse_date("2024-03-01").unwrap();
        ledger
            .store()
            .run_atomic(USER, |unit| {
                let mut day = unit.read_aggregate(date)?.unwrap();
                day.total_income = Decimal::new(30, 0);
                day.income_by_category.insert("salary".to_string(), Decimal::new(30, 0));
                unit.write_aggregate(&day)
            })
            .unwrap();

        ledger.delete(USER, &id).unwrap();

        let day = agg(&ledger, "2024-03-01");
        assert_eq!(day.total_income, Decimal::ZERO);
        assert_eq!(day.income_by_category["salary"], Decimal::ZERO);
        assert!(day.is_consistent());
    }

    #[test]
    fn test_purge_removes_transactions_and_whole_aggregates() {
        let ledger = ledger();
        ledger.insert(USER, expense("food", "2024-03-01", 100)).unwrap();
        ledger.insert(USER, expense("shopping", "2024-03-02", 50)).unwrap();
        ledger.insert(USER, income("salary", "2024-04-01", 900)).unwrap();

        let report = ledger
            .purge_range(
                USER,
                parse_date("2024-03-01").unwrap(),
                parse_date("2024-03-31").unwrap(),
            )
            .unwrap();
        assert!(report.completed);
        assert_eq!(report.deleted, 4); // two transactions + two day documents

        assert!(ledger
            .store()
            .get_aggregate(USER, parse_date("2024-03-01").unwrap())
            .unwrap()
            .is_none());
        assert!(ledger
            .store()
            .get_aggregate(USER, parse_date("2024-03-02").unwrap())
            .unwrap()
            .is_none());
        // April is untouched.
        assert_eq!(agg(&ledger, "2024-04-01").total_income, Decimal::new(900, 0));
    }

    #[test]
    fn test_purge_of_empty_range_reports_zero_not_error() {
        let ledger = ledger();
        let report = ledger
            .purge_range(
                USER,
                parse_date("2024-01-01").unwrap(),
                parse_date("2024-01-31").unwrap(),
            )
            .unwrap();
        assert!(report.completed);
        assert_eq!(report.deleted, 0);
    }

    #[test]
    fn test_purge_rejects_inverted_range() {
        let ledger = ledger();
        let err = ledger
            .purge_range(
                USER,
                parse_date("2024-02-01").unwrap(),
                parse_date("2024-01-01").unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_mutations_do_not_leak_across_users() {
        let ledger = ledger();
        ledger.insert("alice", expense("food", "2024-03-01", 100)).unwrap();
        assert!(ledger
            .store()
            .get_aggregate("bob", parse_date("2024-03-01").unwrap())
            .unwrap()
            .is_none());
        let err = ledger.delete("bob", "whatever").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
