use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, save_settings};
use crate::store::Store;

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    Store::open(&resolved.join("pfennig.db"))?;

    println!("Initialized pfennig store at {}", resolved.display());
    Ok(())
}
