use super::{DatabaseService, DbResult, QueryBuilder};
use crate::models::{Suggestion, SuggestionFilter, SuggestionRequest, SuggestionType};
use crate::utils::SortOrder;

impl DatabaseService {
    pub async fn create_suggestion(&self, req: &SuggestionRequest) -> DbResult<Suggestion> {
        let client = self.get_client().await?;
        let row = client
            .query_one(
                "INSERT INTO suggestions (type, text) VALUES ($1, $2)
                 RETURNING id, type, text, created_at",
                &[&req.kind.as_str(), &req.text.trim()],
            )
            .await?;
        Ok(Self::row_to_suggestion(&row))
    }

    /// Newest first unless `sort_order=asc`.
    pub async fn list_suggestions(&self, filter: &SuggestionFilter) -> DbResult<(Vec<Suggestion>, i64)> {
        let client = self.get_client().await?;
        let page = filter.page();

        let mut qb = QueryBuilder::new();
        if let Some(kind) = filter.kind {
            let p = qb.bind(kind.as_str().to_string());
            qb.push(format!("type = {}", p));
        }
        let where_clause = qb.where_clause();
        let params = qb.params();

        let count_sql = format!("SELECT COUNT(*) FROM suggestions {}", where_clause);
        let total: i64 = client.query_one(count_sql.as_str(), &params).await?.get(0);

        let sql = format!(
            "SELECT id, type, text, created_at FROM suggestions {}
             ORDER BY created_at {}, id LIMIT {} OFFSET {}",
            where_clause,
            filter.sort_order.unwrap_or(SortOrder::Desc).as_sql(),
            page.limit,
            page.offset()
        );
        let rows = client.query(sql.as_str(), &params).await?;
        Ok((rows.iter().map(Self::row_to_suggestion).collect(), total))
    }

    pub async fn delete_suggestion(&self, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let deleted = client
            .execute("DELETE FROM suggestions WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    fn row_to_suggestion(row: &tokio_postgres::Row) -> Suggestion {
        Suggestion {
            id: row.get(0),
            kind: row
                .get::<_, &str>(1)
                .parse()
                .unwrap_or(SuggestionType::Suggestion),
            text: row.get(2),
            created_at: row.get(3),
        }
    }
}
