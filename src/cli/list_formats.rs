use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::formats::ALL_FORMATS;

pub fn run() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Format"]);
    for format in ALL_FORMATS {
        table.add_row(vec![Cell::new(format.key()), Cell::new(format.name())]);
    }
    println!("{table}");
    Ok(())
}
