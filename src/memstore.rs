use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::{LedgerError, Result};
use crate::models::{DailyAggregate, Transaction};
use crate::store::{Store, TransactionPage, TransactionQuery, UnitOfWork};

/// In-memory store. One shard per user partition behind a mutex, so
/// mutations serialize; each atomic unit works on a copy of the shard and
/// swaps it back only on success, so a failed closure leaves no partial
/// effect.
#[derive(Default)]
pub struct MemoryStore {
    shards: Mutex<HashMap<String, UserShard>>,
}

#[derive(Default, Clone)]
struct UserShard {
    transactions: BTreeMap<String, Transaction>,
    aggregates: BTreeMap<NaiveDate, DailyAggregate>,
}

struct MemUnit {
    shard: UserShard,
}

impl UnitOfWork for MemUnit {
    fn read_transaction(&mut self, id: &str) -> Result<Option<Transaction>> {
        Ok(self.shard.transactions.get(id).cloned())
    }

    fn read_aggregate(&mut self, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        Ok(self.shard.aggregates.get(&date).cloned())
    }

    fn write_transaction(&mut self, txn: &Transaction) -> Result<()> {
        self.shard.transactions.insert(txn.id.clone(), txn.clone());
        Ok(())
    }

    fn delete_transaction(&mut self, id: &str) -> Result<()> {
        self.shard.transactions.remove(id);
        Ok(())
    }

    fn write_aggregate(&mut self, agg: &DailyAggregate) -> Result<()> {
        self.shard.aggregates.insert(agg.date, agg.clone());
        Ok(())
    }

    fn delete_aggregate(&mut self, date: NaiveDate) -> Result<()> {
        self.shard.aggregates.remove(&date);
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn with_shard<T>(&self, user_id: &str, f: impl FnOnce(&UserShard) -> T) -> T {
        let shards = self.shards.lock().unwrap();
        match shards.get(user_id) {
            Some(shard) => f(shard),
            None => f(&UserShard::default()),
        }
    }
}

impl Store for MemoryStore {
    fn run_atomic<T, F>(&self, user_id: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&mut dyn UnitOfWork) -> Result<T>,
    {
        // The mutex serializes writers, so the closure never observes a
        // stale read and a single attempt suffices.
        let mut shards = self.shards.lock().unwrap();
        let shard = shards.entry(user_id.to_string()).or_default();
        let mut unit = MemUnit {
            shard: shard.clone(),
        };
        let value = op(&mut unit)?;
        *shard = unit.shard;
        Ok(value)
    }

    fn get_transaction(&self, user_id: &str, id: &str) -> Result<Option<Transaction>> {
        self.with_shard(user_id, |shard| Ok(shard.transactions.get(id).cloned()))
    }

    fn transactions_page(&self, user_id: &str, query: &TransactionQuery) -> Result<TransactionPage> {
        self.with_shard(user_id, |shard| {
            // Most-recent-first with id as the tiebreak, matching the durable
            // store's ordering so cursors are interchangeable.
            let mut matching: Vec<&Transaction> = shard
                .transactions
                .values()
                .filter(|t| query.matches(t))
                .collect();
            matching.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

            if let Some(after_id) = &query.after_id {
                let cursor = shard.transactions.get(after_id).ok_or_else(|| {
                    LedgerError::Validation(format!("unknown cursor transaction id '{after_id}'"))
                })?;
                let key = (cursor.date, cursor.id.as_str());
                matching.retain(|t| (t.date, t.id.as_str()) < key);
            }

            let has_more = matching.len() > query.limit;
            let transactions: Vec<Transaction> = matching
                .into_iter()
                .take(query.limit)
                .cloned()
                .collect();
            let last_id = if has_more {
                transactions.last().map(|t| t.id.clone())
            } else {
                None
            };
            Ok(TransactionPage {
                transactions,
                last_id,
                has_more,
            })
        })
    }

    fn transaction_ids_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>> {
        self.with_shard(user_id, |shard| {
            Ok(shard
                .transactions
                .values()
                .filter(|t| t.date >= start && t.date <= end)
                .map(|t| t.id.clone())
                .collect())
        })
    }

    fn get_aggregate(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        self.with_shard(user_id, |shard| Ok(shard.aggregates.get(&date).cloned()))
    }

    fn aggregates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        self.with_shard(user_id, |shard| {
            Ok(shard
                .aggregates
                .range(start..=end)
                .map(|(_, agg)| agg.clone())
                .collect())
        })
    }

    fn aggregate_dates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        self.with_shard(user_id, |shard| {
            Ok(shard.aggregates.range(start..=end).map(|(d, _)| *d).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{parse_date, TransactionKind, CURRENCY};

    fn txn(id: &str, date: &str, amount: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            kind: TransactionKind::Expense,
            category: "food".to_string(),
            date: parse_date(date).unwrap(),
            amount: Decimal::new(amount, 0),
            description: String::new(),
            currency: CURRENCY.to_string(),
        }
    }

    #[test]
    fn test_failed_unit_leaves_no_partial_effect() {
        let store = MemoryStore::new();
        let result: Result<()> = store.run_atomic("u1", |unit| {
            unit.write_transaction(&txn("t1", "2024-03-01", 100))?;
            Err(LedgerError::Persistence("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.get_transaction("u1", "t1").unwrap().is_none());
    }

    #[test]
    fn test_committed_unit_is_visible() {
        let store = MemoryStore::new();
        store
            .run_atomic("u1", |unit| unit.write_transaction(&txn("t1", "2024-03-01", 100)))
            .unwrap();
        assert!(store.get_transaction("u1", "t1").unwrap().is_some());
    }

    #[test]
    fn test_user_partitions_are_isolated() {
        let store = MemoryStore::new();
        store
            .run_atomic("u1", |unit| unit.write_transaction(&txn("t1", "2024-03-01", 100)))
            .unwrap();
        assert!(store.get_transaction("u2", "t1").unwrap().is_none());
    }

    #[test]
    fn test_page_orders_most_recent_first_and_continues_by_cursor() {
        let store = MemoryStore::new();
        store
            .run_atomic("u1", |unit| {
                unit.write_transaction(&txn("a", "2024-03-01", 10))?;
                unit.write_transaction(&txn("b", "2024-03-02", 20))?;
                unit.write_transaction(&txn("c", "2024-03-03", 30))?;
                Ok(())
            })
            .unwrap();

        let mut query = TransactionQuery::range(
            parse_date("2024-03-01").unwrap(),
            parse_date("2024-03-31").unwrap(),
        );
        query.limit = 2;

        let page = store.transactions_page("u1", &query).unwrap();
        assert_eq!(
            page.transactions.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "b"]
        );
        assert!(page.has_more);
        assert_eq!(page.last_id.as_deref(), Some("b"));

        query.after_id = page.last_id;
        let rest = store.transactions_page("u1", &query).unwrap();
        assert_eq!(rest.transactions.len(), 1);
        assert_eq!(rest.transactions[0].id, "a");
        assert!(!rest.has_more);
        assert!(rest.last_id.is_none());
    }

    #[test]
    fn test_unknown_cursor_is_a_validation_error() {
        let store = MemoryStore::new();
        let mut query = TransactionQuery::range(
            parse_date("2024-03-01").unwrap(),
            parse_date("2024-03-31").unwrap(),
        );
        query.after_id = Some("missing".to_string());
        let err = store.transactions_page("u1", &query).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
