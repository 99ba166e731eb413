mod balances;
mod cli;
mod decoder;
mod error;
mod format;
mod formats;
mod hasher;
mod models;
mod settings;
mod store;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, format, db } => {
            cli::import::run(&file, &format, db.as_deref())
        }
        Commands::Show { db, limit } => cli::show::run(db.as_deref(), limit),
        Commands::Formats => cli::list_formats::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
