use crate::cli::open_ledger;
use crate::error::Result;
use crate::models::parse_date;
use crate::settings::load_settings;

pub fn run(from: &str, to: &str) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;
    let start = parse_date(from)?;
    let end = parse_date(to)?;

    let report = ledger.purge_range(&settings.user_id, start, end)?;
    if report.completed {
        println!("Purged {} records from {start} to {end}", report.deleted);
    } else {
        // Batches commit independently; tell the caller what made it through
        // and that re-running the same range finishes the job.
        println!(
            "Purged {} records before a batch failed: {}",
            report.deleted,
            report
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        );
        println!("Re-run the same purge to delete the remainder.");
    }
    Ok(())
}
