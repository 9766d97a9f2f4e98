use crate::cli::{open_ledger, parse_amount};
use crate::error::{LedgerError, Result};
use crate::fmt::money;
use crate::models::{parse_date, TransactionKind, TransactionPatch};
use crate::settings::load_settings;

pub fn run(
    id: &str,
    kind: Option<&str>,
    category: Option<&str>,
    amount: Option<&str>,
    date: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;

    let patch = TransactionPatch {
        kind: kind.map(TransactionKind::parse).transpose()?,
        category: category.map(str::to_string),
        date: date.map(parse_date).transpose()?,
        amount: amount.map(parse_amount).transpose()?,
        description: description.map(str::to_string),
    };
    if patch.is_empty() {
        return Err(LedgerError::Validation(
            "nothing to change (pass at least one of --type, --category, --amount, --date, --description)"
                .to_string(),
        ));
    }

    let updated = ledger.update(&settings.user_id, id, &patch)?;
    println!(
        "Updated {id}: {} {} of {} on {}",
        updated.kind.as_str().to_lowercase(),
        updated.category,
        money(updated.amount),
        updated.date
    );
    Ok(())
}
