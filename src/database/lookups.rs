//! The four id/name/description reference tables share one set of queries.

use tokio_postgres::Row;

use super::{DatabaseService, DbResult};
use crate::models::{LookupItem, LookupKind, LookupRequest};

fn row_to_item(row: &Row) -> LookupItem {
    LookupItem {
        id: row.get(0),
        name: row.get(1),
        description: row.get(2),
    }
}

impl DatabaseService {
    pub async fn list_lookup(&self, kind: LookupKind) -> DbResult<Vec<LookupItem>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT id, name, description FROM {} ORDER BY id", kind.table());
        let rows = client.query(sql.as_str(), &[]).await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    pub async fn get_lookup(&self, kind: LookupKind, id: i32) -> DbResult<Option<LookupItem>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT id, name, description FROM {} WHERE id = $1", kind.table());
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(row_to_item))
    }

    pub async fn create_lookup(&self, kind: LookupKind, req: &LookupRequest) -> DbResult<LookupItem> {
        let client = self.get_client().await?;
        let sql = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) RETURNING id, name, description",
            kind.table()
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[&req.name.trim(), &req.description.as_deref().unwrap_or_default()],
            )
            .await?;
        Ok(row_to_item(&row))
    }

    pub async fn update_lookup(
        &self,
        kind: LookupKind,
        id: i32,
        req: &LookupRequest,
    ) -> DbResult<Option<LookupItem>> {
        let client = self.get_client().await?;
        let sql = format!(
            "UPDATE {} SET name = $2, description = COALESCE($3, description) WHERE id = $1
             RETURNING id, name, description",
            kind.table()
        );
        let row = client
            .query_opt(sql.as_str(), &[&id, &req.name.trim(), &req.description])
            .await?;
        Ok(row.as_ref().map(row_to_item))
    }

    pub async fn delete_lookup(&self, kind: LookupKind, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        Ok(client.execute(sql.as_str(), &[&id]).await? > 0)
    }
}
