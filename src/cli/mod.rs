pub mod add;
pub mod demo;
pub mod edit;
pub mod export;
pub mod init;
pub mod list;
pub mod purge;
pub mod remove;
pub mod report;
pub mod status;

use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::db::SqliteStore;
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::models::{parse_date, TransactionKind};
use crate::reports::RangeFilter;
use crate::settings::db_path;

#[derive(Parser)]
#[command(
    name = "daybook",
    about = "Personal finance ledger with incrementally maintained daily totals."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up daybook: choose a data directory and initialize the database.
    Init {
        /// Path for daybook data (default: ~/Documents/daybook)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// User partition to record under (default: local)
        #[arg(long)]
        user: Option<String>,
    },
    /// Record a transaction.
    Add {
        /// Income or Expense
        #[arg(long = "type")]
        kind: String,
        /// Category (expense: food, shopping, health, other; income: salary, gift, investment, bonus)
        #[arg(long)]
        category: String,
        /// Amount, e.g. 124.50
        #[arg(long)]
        amount: String,
        /// Calendar day: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a transaction. Omitted fields keep their current value.
    Edit {
        /// Transaction id (shown by `daybook list`)
        id: String,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        /// New calendar day: YYYY-MM-DD (moves the amount between days)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a transaction.
    Remove {
        /// Transaction id (shown by `daybook list`)
        id: String,
    },
    /// Delete every transaction and daily summary in a date range.
    Purge {
        /// Start date: YYYY-MM-DD (inclusive)
        #[arg(long = "from")]
        from: String,
        /// End date: YYYY-MM-DD (inclusive)
        #[arg(long = "to")]
        to: String,
    },
    /// List transactions, newest first.
    List {
        #[arg(long = "from")]
        from: Option<String>,
        #[arg(long = "to")]
        to: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Page size
        #[arg(long, default_value = "5")]
        limit: usize,
        /// Continue after this transaction id (printed by the previous page)
        #[arg(long)]
        after: Option<String>,
    },
    /// Totals for a date range, folded from the daily summaries.
    Report {
        #[arg(long = "from")]
        from: Option<String>,
        #[arg(long = "to")]
        to: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Export matching transactions to CSV.
    Export {
        #[arg(long = "from")]
        from: Option<String>,
        #[arg(long = "to")]
        to: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Output file path (default: daybook-export.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Load a few months of sample data to explore daybook.
    Demo,
    /// Show current database and summary statistics.
    Status,
}

pub(crate) fn open_ledger() -> Result<Ledger<SqliteStore>> {
    let store = SqliteStore::open(&db_path())?;
    Ok(Ledger::new(store))
}

/// First and last day of the current calendar month, the default window when
/// no range is given.
pub(crate) fn current_month_range() -> (NaiveDate, NaiveDate) {
    let today = Local::now().date_naive();
    let first = today.with_day(1).unwrap();
    let last = match first.with_month(first.month() + 1) {
        Some(next) => next.pred_opt().unwrap(),
        None => NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            .unwrap()
            .pred_opt()
            .unwrap(),
    };
    (first, last)
}

/// Both boundaries or neither; defaults to the current month.
pub(crate) fn parse_range(from: &Option<String>, to: &Option<String>) -> Result<(NaiveDate, NaiveDate)> {
    match (from, to) {
        (Some(from), Some(to)) => Ok((parse_date(from)?, parse_date(to)?)),
        (Some(_), None) => Err(LedgerError::Validation(
            "--from requires --to (both date boundaries must be specified)".to_string(),
        )),
        (None, Some(_)) => Err(LedgerError::Validation(
            "--to requires --from (both date boundaries must be specified)".to_string(),
        )),
        (None, None) => Ok(current_month_range()),
    }
}

pub(crate) fn build_filter(
    from: &Option<String>,
    to: &Option<String>,
    kind: &Option<String>,
    category: &Option<String>,
) -> Result<RangeFilter> {
    let (start, end) = parse_range(from, to)?;
    let kind = kind.as_deref().map(TransactionKind::parse).transpose()?;
    let filter = RangeFilter {
        start,
        end,
        kind,
        category: category.clone(),
    };
    filter.validate()?;
    Ok(filter)
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| LedgerError::Validation(format!("invalid amount '{raw}'")))
}
