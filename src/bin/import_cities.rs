//! `import_cities <file.csv>`: loads a semicolon separated city list into the
//! `cities` table. Rows that already exist are left untouched.

use std::path::PathBuf;

use jobsolution_api::config::{self, AppConfig};
use jobsolution_api::database::DatabaseService;
use jobsolution_api::import;
use jobsolution_api::utils;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_problem = config::load_dotenv();

    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            eprintln!("Usage: import_cities <path-to-csv>");
            std::process::exit(2);
        }
    };

    let config = AppConfig::from_env()?;
    utils::logging::init_console(&config.logging.level);
    if let Some(e) = env_problem {
        log::warn!("Ignoring malformed .env file: {}", e);
    }

    let parsed = import::read_cities_file(&path)?;
    println!("Found {} cities to import", parsed.cities.len());

    let db = DatabaseService::new(&config.database).await?;
    let inserted = db.import_cities(&parsed.cities).await?;

    println!(
        "Import finished: {} inserted, {} already present, {} rows skipped",
        inserted,
        (parsed.cities.len() as u64).saturating_sub(inserted),
        parsed.skipped
    );
    Ok(())
}
