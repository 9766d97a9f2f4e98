use std::path::PathBuf;

use crate::cli::{build_filter, open_ledger};
use crate::error::Result;
use crate::export::export_csv;
use crate::settings::load_settings;

pub fn run(
    from: &Option<String>,
    to: &Option<String>,
    kind: &Option<String>,
    category: &Option<String>,
    output: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;
    let filter = build_filter(from, to, kind, category)?;

    let path = PathBuf::from(output.unwrap_or_else(|| "daybook-export.csv".to_string()));
    let rows = export_csv(ledger.store(), &settings.user_id, &filter, &path)?;
    println!("Wrote {rows} transactions to {}", path.display());
    Ok(())
}
