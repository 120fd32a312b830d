use tokio_postgres::Row;

use super::{DatabaseService, DbResult, QueryBuilder};
use crate::models::{City, CityFilter, CityRequest};
use crate::utils::SortOrder;

pub(super) fn row_to_city(row: &Row) -> City {
    City {
        id: row.get(0),
        name: row.get(1),
        region: row.get(2),
        country: row.get(3),
    }
}

/// A row read from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRecord {
    pub name: String,
    pub region: String,
    pub country: String,
}

impl DatabaseService {
    pub async fn list_cities(&self, filter: &CityFilter) -> DbResult<(Vec<City>, i64)> {
        let client = self.get_client().await?;
        let page = filter.page();

        let mut qb = QueryBuilder::new();
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let p = qb.bind(format!("%{}%", search));
            qb.push(format!("(name ILIKE {p} OR region ILIKE {p})", p = p));
        }
        if let Some(country) = filter.country.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let p = qb.bind(country.to_string());
            qb.push(format!("LOWER(country) = LOWER({})", p));
        }
        let where_clause = qb.where_clause();
        let params = qb.params();

        let count_sql = format!("SELECT COUNT(*) FROM cities {}", where_clause);
        let total: i64 = client.query_one(count_sql.as_str(), &params).await?.get(0);

        let sort = filter.sort_by.unwrap_or_default();
        let order = filter.sort_order.unwrap_or(SortOrder::Asc);
        let sql = format!(
            "SELECT id, name, region, country FROM cities {} ORDER BY {} {}, id LIMIT {} OFFSET {}",
            where_clause,
            sort.column(),
            order.as_sql(),
            page.limit,
            page.offset()
        );
        let rows = client.query(sql.as_str(), &params).await?;
        Ok((rows.iter().map(row_to_city).collect(), total))
    }

    pub async fn get_city(&self, id: i32) -> DbResult<Option<City>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt("SELECT id, name, region, country FROM cities WHERE id = $1", &[&id])
            .await?;
        Ok(row.as_ref().map(row_to_city))
    }

    pub async fn create_city(&self, req: &CityRequest) -> DbResult<City> {
        let client = self.get_client().await?;
        let row = client
            .query_one(
                "INSERT INTO cities (name, region, country) VALUES ($1, $2, $3)
                 RETURNING id, name, region, country",
                &[
                    &req.name.trim(),
                    &req.region.as_deref().unwrap_or_default().trim(),
                    &req.country.trim(),
                ],
            )
            .await?;
        Ok(row_to_city(&row))
    }

    pub async fn update_city(&self, id: i32, req: &CityRequest) -> DbResult<Option<City>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt(
                "UPDATE cities SET name = $2, region = $3, country = $4 WHERE id = $1
                 RETURNING id, name, region, country",
                &[
                    &id,
                    &req.name.trim(),
                    &req.region.as_deref().unwrap_or_default().trim(),
                    &req.country.trim(),
                ],
            )
            .await?;
        Ok(row.as_ref().map(row_to_city))
    }

    pub async fn delete_city(&self, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let deleted = client.execute("DELETE FROM cities WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }

    /// Inserts all records in one transaction, skipping ones that already exist.
    /// Returns the number of new rows.
    pub async fn import_cities(&self, records: &[CityRecord]) -> DbResult<u64> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                "INSERT INTO cities (name, region, country) VALUES ($1, $2, $3)
                 ON CONFLICT (name, region, country) DO NOTHING",
            )
            .await?;

        let mut inserted = 0;
        for record in records {
            inserted += tx
                .execute(&stmt, &[&record.name, &record.region, &record.country])
                .await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}
