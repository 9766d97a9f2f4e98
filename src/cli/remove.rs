use crate::cli::open_ledger;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run(id: &str) -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;
    ledger.delete(&settings.user_id, id)?;
    println!("Removed transaction {id}");
    Ok(())
}
