use anyhow::{Context, Result};

use crate::db::{get_connection, init_db};
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let conn = get_connection(&db_path, settings.busy_timeout())?;
    init_db(&conn)?;
    println!("Database ready at {}", db_path.display());
    Ok(())
}
