use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;
use crate::models::AdminStatistics;

mod cities;
mod companies;
mod industries;
mod lookups;
pub mod migrations;
mod reviews;
mod suggestions;
mod tokens;
mod users;

pub use cities::CityRecord;
pub use industries::DEFAULT_INDUSTRY_COLOR;
pub use reviews::{ReviewTransition, UsefulMarkChange};
pub use users::{AdminChange, NewUser};

/// Database connection pool
pub type DbPool = Pool;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("pool configuration error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("migration {file} failed: {reason}")]
    Migration { file: String, reason: String },
}

impl DbError {
    fn db_error(&self) -> Option<&tokio_postgres::error::DbError> {
        match self {
            DbError::Postgres(err) => err.as_db_error(),
            DbError::Pool(deadpool_postgres::PoolError::Backend(err)) => err.as_db_error(),
            _ => None,
        }
    }

    /// Name of the violated unique constraint, if that is what failed.
    pub fn unique_violation(&self) -> Option<String> {
        self.db_error()
            .filter(|e| *e.code() == SqlState::UNIQUE_VIOLATION)
            .map(|e| e.constraint().unwrap_or_default().to_string())
    }

    pub fn foreign_key_violation(&self) -> Option<String> {
        self.db_error()
            .filter(|e| *e.code() == SqlState::FOREIGN_KEY_VIOLATION)
            .map(|e| e.constraint().unwrap_or_default().to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database service. Entity-specific queries live in the submodules as further `impl` blocks.
pub struct DatabaseService {
    pool: DbPool,
}

impl DatabaseService {
    /// Create a new database service with connection pool
    pub async fn new(config: &DatabaseConfig) -> DbResult<Self> {
        let service = Self::connect_lazy(config)?;

        // Fail fast on bad credentials
        service.ping().await?;

        log::info!("Database connection established (pool size {})", config.max_connections);

        Ok(service)
    }

    /// Builds the pool without opening a connection; the first query connects.
    pub fn connect_lazy(config: &DatabaseConfig) -> DbResult<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(config.connection_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.max_connections.max(1)));

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(Self { pool })
    }

    /// Get a database client from the pool
    pub async fn get_client(&self) -> DbResult<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    pub async fn ping(&self) -> DbResult<()> {
        let client = self.get_client().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    /// Applies pending migrations from `dir`; returns the filenames applied now.
    pub async fn run_migrations(&self, dir: &str) -> DbResult<Vec<String>> {
        let mut client = self.get_client().await?;
        migrations::run(&mut client, dir).await
    }

    pub async fn statistics(&self) -> DbResult<AdminStatistics> {
        let client = self.get_client().await?;
        let row = client
            .query_one(
                "SELECT
                    (SELECT COUNT(*) FROM users) AS users_count,
                    (SELECT COUNT(*) FROM companies) AS companies_count,
                    (SELECT COUNT(*) FROM reviews) AS reviews_count,
                    (SELECT COUNT(*) FROM reviews WHERE status = 'pending') AS pending_reviews,
                    (SELECT COUNT(*) FROM reviews WHERE status = 'approved') AS approved_reviews,
                    (SELECT COUNT(*) FROM reviews WHERE status = 'rejected') AS rejected_reviews,
                    (SELECT COUNT(*) FROM cities) AS cities_count,
                    (SELECT COUNT(*) FROM industries) AS industries_count,
                    (SELECT COUNT(*) FROM benefit_types) AS benefit_types_count,
                    (SELECT COUNT(*) FROM rating_categories) AS rating_categories_count,
                    (SELECT COUNT(*) FROM employment_types) AS employment_types_count,
                    (SELECT COUNT(*) FROM employment_periods) AS employment_periods_count",
                &[],
            )
            .await?;

        Ok(AdminStatistics {
            users_count: row.get("users_count"),
            companies_count: row.get("companies_count"),
            reviews_count: row.get("reviews_count"),
            pending_reviews: row.get("pending_reviews"),
            approved_reviews: row.get("approved_reviews"),
            rejected_reviews: row.get("rejected_reviews"),
            cities_count: row.get("cities_count"),
            industries_count: row.get("industries_count"),
            benefit_types_count: row.get("benefit_types_count"),
            rating_categories_count: row.get("rating_categories_count"),
            employment_types_count: row.get("employment_types_count"),
            employment_periods_count: row.get("employment_periods_count"),
        })
    }

    /// Labels of the dependents that still reference `id`; empty means the row may be deleted.
    pub async fn referencing_tables(
        &self,
        dependents: &[crate::models::Dependent],
        id: i32,
    ) -> DbResult<Vec<&'static str>> {
        let client = self.get_client().await?;
        let mut used = Vec::new();
        for dep in dependents {
            // Table and column names come from static definitions, never from input.
            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1)",
                dep.table, dep.column
            );
            let row = client.query_one(sql.as_str(), &[&id]).await?;
            if row.get::<_, bool>(0) && !used.contains(&dep.label) {
                used.push(dep.label);
            }
        }
        Ok(used)
    }
}

/// Builds `WHERE` clauses and their positional parameters together so placeholders never drift.
pub(crate) struct QueryBuilder {
    conditions: Vec<String>,
    params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its `$n` placeholder.
    pub fn bind<T>(&mut self, value: T) -> String
    where
        T: tokio_postgres::types::ToSql + Sync + Send + 'static,
    {
        self.params.push(Box::new(value));
        format!("${}", self.params.len())
    }

    pub fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_numbers_placeholders_in_order() {
        let mut qb = QueryBuilder::new();
        let a = qb.bind(5i32);
        qb.push(format!("c.city_id = {}", a));
        let b = qb.bind("%acme%".to_string());
        qb.push(format!("c.name ILIKE {}", b));
        assert_eq!(qb.where_clause(), "WHERE c.city_id = $1 AND c.name ILIKE $2");
        assert_eq!(qb.params().len(), 2);
        assert_eq!(QueryBuilder::new().where_clause(), "");
    }
}
