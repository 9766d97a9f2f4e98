use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{build_filter, open_ledger};
use crate::error::Result;
use crate::fmt::money;
use crate::models::TransactionKind;
use crate::reports::list_page;
use crate::settings::load_settings;

pub fn run(
    from: &Option<String>,
    to: &Option<String>,
    kind: &Option<String>,
    category: &Option<String>,
    limit: usize,
    after: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;
    let filter = build_filter(from, to, kind, category)?;

    let page = list_page(ledger.store(), &settings.user_id, &filter, limit, after)?;
    if page.transactions.is_empty() {
        println!("No transactions between {} and {}", filter.start, filter.end);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Type", "Category", "Amount", "Description", "ID"]);
    for txn in &page.transactions {
        let kind_cell = match txn.kind {
            TransactionKind::Income => Cell::new("Income".green().to_string()),
            TransactionKind::Expense => Cell::new("Expense".red().to_string()),
        };
        table.add_row(vec![
            Cell::new(txn.date),
            kind_cell,
            Cell::new(&txn.category),
            Cell::new(money(txn.amount)),
            Cell::new(&txn.description),
            Cell::new(&txn.id),
        ]);
    }
    println!("{table}");

    if page.has_more {
        if let Some(last_id) = page.last_id {
            println!("More results: add --after {last_id}");
        }
    }
    Ok(())
}
