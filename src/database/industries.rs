use tokio_postgres::Row;

use super::{DatabaseService, DbResult, QueryBuilder};
use crate::models::{Industry, IndustryFilter, IndustryRequest};
use crate::utils::SortOrder;

pub const DEFAULT_INDUSTRY_COLOR: &str = "#6B7280";

fn row_to_industry(row: &Row) -> Industry {
    Industry {
        id: row.get(0),
        name: row.get(1),
        color: row.get(2),
    }
}

impl DatabaseService {
    pub async fn list_industries(&self, filter: &IndustryFilter) -> DbResult<(Vec<Industry>, i64)> {
        let client = self.get_client().await?;
        let page = filter.page();

        let mut qb = QueryBuilder::new();
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let p = qb.bind(format!("%{}%", search));
            qb.push(format!("name ILIKE {}", p));
        }
        let where_clause = qb.where_clause();
        let params = qb.params();

        let count_sql = format!("SELECT COUNT(*) FROM industries {}", where_clause);
        let total: i64 = client.query_one(count_sql.as_str(), &params).await?.get(0);

        let sql = format!(
            "SELECT id, name, color FROM industries {} ORDER BY name {}, id LIMIT {} OFFSET {}",
            where_clause,
            filter.sort_order.unwrap_or(SortOrder::Asc).as_sql(),
            page.limit,
            page.offset()
        );
        let rows = client.query(sql.as_str(), &params).await?;
        Ok((rows.iter().map(row_to_industry).collect(), total))
    }

    pub async fn get_industry(&self, id: i32) -> DbResult<Option<Industry>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt("SELECT id, name, color FROM industries WHERE id = $1", &[&id])
            .await?;
        Ok(row.as_ref().map(row_to_industry))
    }

    pub async fn industries_for_company(&self, company_id: i32) -> DbResult<Vec<Industry>> {
        let client = self.get_client().await?;
        let rows = client
            .query(
                "SELECT i.id, i.name, i.color
                 FROM industries i
                 JOIN company_industries ci ON ci.industry_id = i.id
                 WHERE ci.company_id = $1
                 ORDER BY i.name",
                &[&company_id],
            )
            .await?;
        Ok(rows.iter().map(row_to_industry).collect())
    }

    /// Ids from `ids` that have no row in `table`.
    pub async fn missing_ids(&self, table: &'static str, ids: &[i32]) -> DbResult<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.get_client().await?;
        let sql = format!("SELECT id FROM {} WHERE id = ANY($1)", table);
        let found: Vec<i32> = client
            .query(sql.as_str(), &[&ids])
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();
        let mut missing: Vec<i32> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
        missing.sort_unstable();
        missing.dedup();
        Ok(missing)
    }

    pub async fn create_industry(&self, req: &IndustryRequest) -> DbResult<Industry> {
        let client = self.get_client().await?;
        let color = req.color.as_deref().unwrap_or(DEFAULT_INDUSTRY_COLOR);
        let row = client
            .query_one(
                "INSERT INTO industries (name, color) VALUES ($1, $2) RETURNING id, name, color",
                &[&req.name.trim(), &color],
            )
            .await?;
        Ok(row_to_industry(&row))
    }

    /// Renames the industry; the color is only touched when one is supplied.
    pub async fn update_industry(&self, id: i32, req: &IndustryRequest) -> DbResult<Option<Industry>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt(
                "UPDATE industries SET name = $2, color = COALESCE($3, color) WHERE id = $1
                 RETURNING id, name, color",
                &[&id, &req.name.trim(), &req.color],
            )
            .await?;
        Ok(row.as_ref().map(row_to_industry))
    }

    pub async fn update_industry_color(&self, id: i32, color: &str) -> DbResult<Option<Industry>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt(
                "UPDATE industries SET color = $2 WHERE id = $1 RETURNING id, name, color",
                &[&id, &color],
            )
            .await?;
        Ok(row.as_ref().map(row_to_industry))
    }

    pub async fn delete_industry(&self, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let deleted = client
            .execute("DELETE FROM industries WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
