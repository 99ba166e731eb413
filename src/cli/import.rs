use std::path::Path;

use crate::cli::resolve_db_path;
use crate::decoder::decode_file;
use crate::error::{PfennigError, Result};
use crate::formats::CsvFormat;
use crate::store::Store;

pub fn run(file: &str, format_key: &str, db: Option<&str>) -> Result<()> {
    let format = CsvFormat::from_key(format_key)
        .ok_or_else(|| PfennigError::Config(format!("unknown format key: {format_key}")))?;
    let spec = format.spec()?;

    let mut records = decode_file(Path::new(file), &spec)?;
    for tx in &mut records {
        tx.origin = Some(format.key().to_string());
    }

    let store = Store::open(&resolve_db_path(db))?;
    let new_rows = store.append(&records)?;

    println!(
        "{} imported, {} skipped (duplicates)",
        new_rows.len(),
        records.len() - new_rows.len()
    );
    Ok(())
}
