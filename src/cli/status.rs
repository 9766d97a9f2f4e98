use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let path = db_path();
    if !path.exists() {
        println!("No database at {} — run `daybook init` first.", path.display());
        return Ok(());
    }

    let conn = get_connection(&path)?;
    let transactions: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE user_id = ?1",
        [&settings.user_id],
        |row| row.get(0),
    )?;
    let days: i64 = conn.query_row(
        "SELECT count(*) FROM daily_aggregates WHERE user_id = ?1",
        [&settings.user_id],
        |row| row.get(0),
    )?;
    let range: (Option<String>, Option<String>) = conn.query_row(
        "SELECT min(date), max(date) FROM transactions WHERE user_id = ?1",
        [&settings.user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    println!("Database: {}", path.display());
    println!("User: {}", settings.user_id);
    println!("Transactions: {transactions}");
    println!("Days summarized: {days}");
    if let (Some(first), Some(last)) = range {
        println!("Date range: {first} to {last}");
    }
    Ok(())
}
