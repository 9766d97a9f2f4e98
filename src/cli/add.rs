use chrono::Local;

use crate::cli::{open_ledger, parse_amount};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{parse_date, TransactionDraft, TransactionKind};
use crate::settings::load_settings;

pub fn run(
    kind: &str,
    category: &str,
    amount: &str,
    date: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;

    let draft = TransactionDraft {
        kind: TransactionKind::parse(kind)?,
        category: category.to_string(),
        date: match date {
            Some(raw) => parse_date(raw)?,
            None => Local::now().date_naive(),
        },
        amount: parse_amount(amount)?,
        description: description.unwrap_or_default().to_string(),
    };

    let kind = draft.kind;
    let date = draft.date;
    let amount = draft.amount;
    let id = ledger.insert(&settings.user_id, draft)?;
    println!(
        "Added {} {} of {} on {}",
        kind.as_str().to_lowercase(),
        category,
        money(amount),
        date
    );
    println!("id: {id}");
    Ok(())
}
