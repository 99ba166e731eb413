pub mod import;
pub mod init;
pub mod list_formats;
pub mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::default_db_path;

pub(crate) fn resolve_db_path(db: Option<&str>) -> PathBuf {
    match db {
        Some(path) => PathBuf::from(path),
        None => default_db_path(),
    }
}

#[derive(Parser)]
#[command(name = "pfennig", about = "Import bank statement CSV exports into a deduplicated transaction store.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and create the transaction store.
    Init {
        /// Path for pfennig data (default: platform data dir)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a statement CSV file.
    Import {
        /// Path to the CSV file to import
        file: String,
        /// Format key (see `pfennig formats`)
        #[arg(long)]
        format: String,
        /// Store location (default: from settings)
        #[arg(long)]
        db: Option<String>,
    },
    /// List stored transactions.
    Show {
        /// Store location (default: from settings)
        #[arg(long)]
        db: Option<String>,
        /// Show at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the supported statement formats.
    Formats,
}
