use comfy_table::{Cell, Table};

use crate::cli::resolve_db_path;
use crate::error::Result;
use crate::store::Store;

pub fn run(db: Option<&str>, limit: Option<usize>) -> Result<()> {
    let store = Store::open(&resolve_db_path(db))?;
    let mut records = store.load()?;
    let total = records.len();
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Text", "Amount", "Balance", "Currency", "Category"]);
    for tx in &records {
        table.add_row(vec![
            Cell::new(tx.date.format("%Y-%m-%d")),
            Cell::new(&tx.text),
            Cell::new(format!("{:.2}", tx.amount)),
            Cell::new(format!("{:.2}", tx.total_balance)),
            Cell::new(tx.currency.clone().unwrap_or_default()),
            Cell::new(tx.category.clone().unwrap_or_default()),
        ]);
    }
    println!("{table}");
    println!("{total} transactions");
    Ok(())
}
