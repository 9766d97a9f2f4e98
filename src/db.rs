use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{DailyAggregate, Transaction, TransactionKind};
use crate::store::{Store, TransactionPage, TransactionQuery, UnitOfWork};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    currency TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_user_date
    ON transactions(user_id, date);

CREATE TABLE IF NOT EXISTS daily_aggregates (
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    total_expense TEXT NOT NULL,
    total_income TEXT NOT NULL,
    expense_by_category TEXT NOT NULL,
    income_by_category TEXT NOT NULL,
    last_updated INTEGER NOT NULL,
    PRIMARY KEY (user_id, date)
);
";

/// Attempts per atomic unit before giving up with `Conflict`.
const MAX_TXN_RETRIES: usize = 5;

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
    )?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Durable store on SQLite. The connection is owned behind a mutex; each
/// atomic unit runs as one IMMEDIATE transaction so writers serialize, with
/// a bounded retry loop for busy/locked contention from other processes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

type RawTxn = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn malformed(what: &str, detail: impl std::fmt::Display) -> LedgerError {
    LedgerError::Persistence(format!("stored {what} is malformed: {detail}"))
}

fn decode_txn(raw: RawTxn) -> Result<Transaction> {
    let (user_id, id, kind, category, date, amount, description, currency) = raw;
    Ok(Transaction {
        user_id,
        id,
        kind: TransactionKind::parse(&kind)
            .map_err(|_| malformed("transaction", format!("unknown kind '{kind}'")))?,
        category,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| malformed("transaction", e))?,
        amount: Decimal::from_str(&amount).map_err(|e| malformed("transaction", e))?,
        description,
        currency,
    })
}

const TXN_COLUMNS: &str = "user_id, id, kind, category, date, amount, description, currency";

fn txn_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawTxn> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

type RawAggregate = (String, String, String, String, String, i64);

fn decode_aggregate(raw: RawAggregate) -> Result<DailyAggregate> {
    let (date, total_expense, total_income, expense_json, income_json, last_updated) = raw;
    let expense_by_category: BTreeMap<String, Decimal> = serde_json::from_str(&expense_json)?;
    let income_by_category: BTreeMap<String, Decimal> = serde_json::from_str(&income_json)?;
    Ok(DailyAggregate {
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| malformed("aggregate", e))?,
        total_expense: Decimal::from_str(&total_expense).map_err(|e| malformed("aggregate", e))?,
        total_income: Decimal::from_str(&total_income).map_err(|e| malformed("aggregate", e))?,
        expense_by_category,
        income_by_category,
        last_updated,
    })
}

const AGG_COLUMNS: &str =
    "date, total_expense, total_income, expense_by_category, income_by_category, last_updated";

fn aggregate_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawAggregate> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

// ---------------------------------------------------------------------------
// Shared statement helpers (used from both the store and atomic units —
// rusqlite transactions deref to the connection)
// ---------------------------------------------------------------------------

fn fetch_transaction(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Transaction>> {
    let sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE user_id = ?1 AND id = ?2");
    let raw = conn
        .query_row(&sql, [user_id, id], txn_from_row)
        .optional()?;
    raw.map(decode_txn).transpose()
}

fn store_transaction(conn: &Connection, txn: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO transactions \
         (user_id, id, kind, category, date, amount, description, currency) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            txn.user_id,
            txn.id,
            txn.kind.as_str(),
            txn.category,
            txn.date.format("%Y-%m-%d").to_string(),
            txn.amount.to_string(),
            txn.description,
            txn.currency,
        ],
    )?;
    Ok(())
}

fn remove_transaction(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM transactions WHERE user_id = ?1 AND id = ?2",
        [user_id, id],
    )?;
    Ok(())
}

fn fetch_aggregate(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<DailyAggregate>> {
    let sql =
        format!("SELECT {AGG_COLUMNS} FROM daily_aggregates WHERE user_id = ?1 AND date = ?2");
    let date = date.format("%Y-%m-%d").to_string();
    let raw = conn
        .query_row(&sql, [user_id, date.as_str()], aggregate_from_row)
        .optional()?;
    raw.map(decode_aggregate).transpose()
}

fn store_aggregate(conn: &Connection, user_id: &str, agg: &DailyAggregate) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO daily_aggregates \
         (user_id, date, total_expense, total_income, expense_by_category, income_by_category, last_updated) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            user_id,
            agg.date.format("%Y-%m-%d").to_string(),
            agg.total_expense.to_string(),
            agg.total_income.to_string(),
            serde_json::to_string(&agg.expense_by_category)?,
            serde_json::to_string(&agg.income_by_category)?,
            agg.last_updated,
        ],
    )?;
    Ok(())
}

fn remove_aggregate(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<()> {
    let date = date.format("%Y-%m-%d").to_string();
    conn.execute(
        "DELETE FROM daily_aggregates WHERE user_id = ?1 AND date = ?2",
        [user_id, date.as_str()],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Atomic units
// ---------------------------------------------------------------------------

struct SqliteUnit<'a, 'conn> {
    tx: &'a rusqlite::Transaction<'conn>,
    user_id: &'a str,
}

impl UnitOfWork for SqliteUnit<'_, '_> {
    fn read_transaction(&mut self, id: &str) -> Result<Option<Transaction>> {
        fetch_transaction(self.tx, self.user_id, id)
    }

    fn read_aggregate(&mut self, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        fetch_aggregate(self.tx, self.user_id, date)
    }

    fn write_transaction(&mut self, txn: &Transaction) -> Result<()> {
        store_transaction(self.tx, txn)
    }

    fn delete_transaction(&mut self, id: &str) -> Result<()> {
        remove_transaction(self.tx, self.user_id, id)
    }

    fn write_aggregate(&mut self, agg: &DailyAggregate) -> Result<()> {
        store_aggregate(self.tx, self.user_id, agg)
    }

    fn delete_aggregate(&mut self, date: NaiveDate) -> Result<()> {
        remove_aggregate(self.tx, self.user_id, date)
    }
}

impl Store for SqliteStore {
    fn run_atomic<T, F>(&self, user_id: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&mut dyn UnitOfWork) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let mut last_err: Option<LedgerError> = None;

        for _ in 0..MAX_TXN_RETRIES {
            let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(e) => {
                    let e = LedgerError::from(e);
                    if e.is_retryable() {
                        last_err = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            };

            let mut unit = SqliteUnit { tx: &tx, user_id };
            match op(&mut unit) {
                Ok(value) => match tx.commit() {
                    Ok(()) => return Ok(value),
                    Err(e) => {
                        let e = LedgerError::from(e);
                        if e.is_retryable() {
                            last_err = Some(e);
                            continue;
                        }
                        return Err(e);
                    }
                },
                // Dropping the transaction rolls back; a retryable failure
                // gets a fresh attempt against current state.
                Err(e) if e.is_retryable() => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::Conflict(format!(
            "atomic unit gave up after {MAX_TXN_RETRIES} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn get_transaction(&self, user_id: &str, id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        fetch_transaction(&conn, user_id, id)
    }

    fn transactions_page(&self, user_id: &str, query: &TransactionQuery) -> Result<TransactionPage> {
        let conn = self.conn.lock().unwrap();

        let mut clauses = vec![
            "user_id = ?".to_string(),
            "date >= ?".to_string(),
            "date <= ?".to_string(),
        ];
        let mut params: Vec<String> = vec![
            user_id.to_string(),
            query.start.format("%Y-%m-%d").to_string(),
            query.end.format("%Y-%m-%d").to_string(),
        ];
        if let Some(kind) = query.kind {
            clauses.push("kind = ?".to_string());
            params.push(kind.as_str().to_string());
        }
        if let Some(category) = &query.category {
            clauses.push("category = ?".to_string());
            params.push(category.clone());
        }
        if let Some(after_id) = &query.after_id {
            let cursor = fetch_transaction(&conn, user_id, after_id)?.ok_or_else(|| {
                LedgerError::Validation(format!("unknown cursor transaction id '{after_id}'"))
            })?;
            let cursor_date = cursor.date.format("%Y-%m-%d").to_string();
            clauses.push("(date < ? OR (date = ? AND id < ?))".to_string());
            params.push(cursor_date.clone());
            params.push(cursor_date);
            params.push(cursor.id);
        }

        // Fetch one past the page to decide has_more without a second query.
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions WHERE {} \
             ORDER BY date DESC, id DESC LIMIT {}",
            clauses.join(" AND "),
            query.limit + 1,
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw: Vec<RawTxn> = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), txn_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let has_more = raw.len() > query.limit;
        let transactions: Vec<Transaction> = raw
            .into_iter()
            .take(query.limit)
            .map(decode_txn)
            .collect::<Result<Vec<_>>>()?;
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
    }

    fn transaction_ids_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM transactions WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date, id",
        )?;
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let ids = stmt
            .query_map([user_id, start.as_str(), end.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn get_aggregate(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        let conn = self.conn.lock().unwrap();
        fetch_aggregate(&conn, user_id, date)
    }

    fn aggregates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {AGG_COLUMNS} FROM daily_aggregates \
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date"
        );
        let mut stmt = conn.prepare(&sql)?;
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let raw: Vec<RawAggregate> = stmt
            .query_map([user_id, start.as_str(), end.as_str()], aggregate_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.into_iter().map(decode_aggregate).collect()
    }

    fn aggregate_dates_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT date FROM daily_aggregates \
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date",
        )?;
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let dates: Vec<String> = stmt
            .query_map([user_id, start.as_str(), end.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        dates
            .into_iter()
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| malformed("aggregate", e))
            })
            .collect()
    }
}
