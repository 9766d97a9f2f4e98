use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{build_filter, open_ledger};
use crate::error::Result;
use crate::fmt::money;
use crate::models::TransactionKind;
use crate::reports::summarize_range;
use crate::settings::load_settings;

pub fn run(
    from: &Option<String>,
    to: &Option<String>,
    kind: &Option<String>,
    category: &Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;
    let filter = build_filter(from, to, kind, category)?;

    let summary = summarize_range(ledger.store(), &settings.user_id, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount"]);

    let show_income = filter.kind != Some(TransactionKind::Expense);
    let show_expense = filter.kind != Some(TransactionKind::Income);

    if show_income {
        table.add_row(vec![Cell::new("INCOME".green().bold()), Cell::new("")]);
        for (name, total) in &summary.income_by_category {
            table.add_row(vec![
                Cell::new(format!("  {name}")),
                Cell::new(money(*total)),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total Income".bold()),
            Cell::new(money(summary.total_income)),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new("")]);
    }

    if show_expense {
        table.add_row(vec![Cell::new("EXPENSES".red().bold()), Cell::new("")]);
        for (name, total) in &summary.expense_by_category {
            table.add_row(vec![
                Cell::new(format!("  {name}")),
                Cell::new(money(*total)),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total Expenses".bold()),
            Cell::new(money(summary.total_expense)),
        ]);
    }

    if filter.kind.is_none() {
        table.add_row(vec![Cell::new(""), Cell::new("")]);
        table.add_row(vec![
            Cell::new("Net".bold()),
            Cell::new(money(summary.total_income - summary.total_expense)),
        ]);
    }

    println!(
        "Totals {} to {} ({} day{} with activity)",
        filter.start,
        filter.end,
        summary.days,
        if summary.days == 1 { "" } else { "s" }
    );
    println!("{table}");
    Ok(())
}
