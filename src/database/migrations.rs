//! Ordered SQL migrations tracked by filename in `migration_history`.

use std::path::{Path, PathBuf};

use super::{DbError, DbResult};

const HISTORY_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS migration_history (
        id SERIAL PRIMARY KEY,
        filename VARCHAR(255) NOT NULL UNIQUE,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )";

/// `dir/V*.sql`, sorted by filename.
pub fn discover(dir: &str) -> DbResult<Vec<PathBuf>> {
    let pattern = format!("{}/V*.sql", dir.trim_end_matches('/'));
    let paths = glob::glob(&pattern).map_err(|e| DbError::Migration {
        file: pattern.clone(),
        reason: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Applies every migration not yet recorded. Each file and its history row commit together.
pub async fn run(client: &mut tokio_postgres::Client, dir: &str) -> DbResult<Vec<String>> {
    client.batch_execute(HISTORY_TABLE).await?;

    let applied: Vec<String> = client
        .query("SELECT filename FROM migration_history", &[])
        .await?
        .iter()
        .map(|row| row.get(0))
        .collect();

    let mut newly_applied = Vec::new();
    for path in discover(dir)? {
        let name = file_name(&path);
        if applied.contains(&name) {
            log::debug!("Migration {} already applied", name);
            continue;
        }

        let sql = std::fs::read_to_string(&path).map_err(|e| DbError::Migration {
            file: name.clone(),
            reason: e.to_string(),
        })?;

        let tx = client.transaction().await?;
        tx.batch_execute(&sql).await.map_err(|e| DbError::Migration {
            file: name.clone(),
            reason: e.to_string(),
        })?;
        tx.execute("INSERT INTO migration_history (filename) VALUES ($1)", &[&name])
            .await?;
        tx.commit().await?;

        log::info!("Applied migration {}", name);
        newly_applied.push(name);
    }

    if newly_applied.is_empty() {
        log::info!("Database schema is up to date");
    }
    Ok(newly_applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_bundled_migrations_in_order() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");
        let names: Vec<String> = discover(dir).unwrap().iter().map(|p| file_name(p)).collect();
        assert!(names.len() >= 5);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names[0].starts_with("V001"));
    }

    #[test]
    fn missing_directory_yields_nothing() {
        assert!(discover("/nonexistent/migrations").unwrap().is_empty());
    }
}
