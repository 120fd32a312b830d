//! Applies pending `migrations/V*.sql` files and exits.

use jobsolution_api::config::{self, AppConfig};
use jobsolution_api::database::DatabaseService;
use jobsolution_api::utils;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_problem = config::load_dotenv();

    let config = AppConfig::from_env()?;
    utils::logging::init_console(&config.logging.level);
    if let Some(e) = env_problem {
        log::warn!("Ignoring malformed .env file: {}", e);
    }

    let db = DatabaseService::new(&config.database).await?;
    let applied = db.run_migrations(&config.database.migrations_dir).await?;

    if applied.is_empty() {
        println!("Schema is up to date");
    } else {
        for name in &applied {
            println!("Applied: {}", name);
        }
        println!("Migrations complete ({} applied)", applied.len());
    }
    Ok(())
}
