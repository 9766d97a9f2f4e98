use crate::db::SqliteStore;
use crate::error::Result;
use crate::settings::{save_settings, Settings};

pub fn run(data_dir: Option<String>, user: Option<String>) -> Result<()> {
    let mut settings = Settings::default();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(user) = user {
        settings.user_id = user;
    }

    std::fs::create_dir_all(&settings.data_dir)?;
    save_settings(&settings)?;

    let db_path = std::path::Path::new(&settings.data_dir).join("daybook.db");
    SqliteStore::open(&db_path)?;

    println!("Initialized daybook database at {}", db_path.display());
    println!("Recording as user '{}'", settings.user_id);
    Ok(())
}
