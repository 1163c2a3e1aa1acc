use anyhow::Result;

use crate::db::{get_connection, table_counts};
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();

    println!("Environment:  {}", settings.env);
    println!("Database:     {}", db_path.display());
    println!("Sheet:        {}", settings.sheet);
    println!("Range:        {}", settings.range);

    if db_path.exists() {
        let conn = get_connection(&db_path, settings.busy_timeout())?;
        let counts = table_counts(&conn)?;

        println!();
        println!("Suppliers:         {}", counts.suppliers);
        println!("Supplier details:  {}", counts.supplier_details);
        println!("Bank accounts:     {}", counts.bank_accounts);
    } else {
        println!();
        println!("Database not found. Run `supplier-sync init` to set up.");
    }

    Ok(())
}
