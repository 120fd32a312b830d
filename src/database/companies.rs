use std::collections::HashMap;

use tokio_postgres::{Client, Row, Transaction};

use super::{DatabaseService, DbResult, QueryBuilder};
use crate::models::{
    City, Company, CompanyCategoryRating, CompanyFilter, CompanyRequest, CompanySize, CompanySort,
    CompanyWithRatings, Industry,
};
use crate::utils::slug::company_slug;
use crate::utils::SortOrder;

const COMPANY_COLUMNS: &str = "c.id, c.name, c.slug, c.size, c.logo, c.website, c.email, c.phone, \
     c.address, c.city_id, c.reviews_count, c.average_rating, c.recommendation_percentage, \
     c.created_at, c.updated_at";

/// Rebuilds a company's aggregates from its approved reviews. Must run inside the
/// transaction that changed those reviews.
pub(super) async fn recompute_company_rating(tx: &Transaction<'_>, company_id: i32) -> DbResult<()> {
    tx.execute(
        "UPDATE companies SET
            average_rating = COALESCE(agg.avg_rating, 0),
            reviews_count = agg.cnt,
            recommendation_percentage = CASE WHEN agg.cnt > 0
                THEN agg.recommended * 100.0 / agg.cnt ELSE 0 END,
            updated_at = NOW()
         FROM (
            SELECT AVG(rating) AS avg_rating,
                   COUNT(*)::INTEGER AS cnt,
                   COALESCE(SUM(CASE WHEN is_recommended THEN 1 ELSE 0 END), 0) AS recommended
            FROM reviews
            WHERE company_id = $1 AND status = 'approved'
         ) agg
         WHERE companies.id = $1",
        &[&company_id],
    )
    .await?;

    tx.execute(
        "DELETE FROM company_category_ratings WHERE company_id = $1",
        &[&company_id],
    )
    .await?;
    tx.execute(
        "INSERT INTO company_category_ratings (company_id, category_id, rating)
         SELECT r.company_id, rcr.category_id, AVG(rcr.rating)
         FROM review_category_ratings rcr
         JOIN reviews r ON r.id = rcr.review_id
         WHERE r.company_id = $1 AND r.status = 'approved'
         GROUP BY r.company_id, rcr.category_id",
        &[&company_id],
    )
    .await?;

    Ok(())
}

/// Loads industries, category ratings and cities for a page of companies in three queries.
async fn attach_details(client: &Client, companies: Vec<Company>) -> DbResult<Vec<CompanyWithRatings>> {
    if companies.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = companies.iter().map(|c| c.id).collect();
    let city_ids: Vec<i32> = companies.iter().filter_map(|c| c.city_id).collect();

    let mut industries: HashMap<i32, Vec<Industry>> = HashMap::new();
    for row in client
        .query(
            "SELECT ci.company_id, i.id, i.name, i.color
             FROM company_industries ci
             JOIN industries i ON i.id = ci.industry_id
             WHERE ci.company_id = ANY($1)
             ORDER BY i.name",
            &[&ids],
        )
        .await?
    {
        industries.entry(row.get(0)).or_default().push(Industry {
            id: row.get(1),
            name: row.get(2),
            color: row.get(3),
        });
    }

    let mut ratings: HashMap<i32, Vec<CompanyCategoryRating>> = HashMap::new();
    for row in client
        .query(
            "SELECT ccr.company_id, rc.id, rc.name, ccr.rating
             FROM company_category_ratings ccr
             JOIN rating_categories rc ON rc.id = ccr.category_id
             WHERE ccr.company_id = ANY($1)
             ORDER BY rc.id",
            &[&ids],
        )
        .await?
    {
        ratings.entry(row.get(0)).or_default().push(CompanyCategoryRating {
            category_id: row.get(1),
            category: row.get(2),
            rating: row.get(3),
        });
    }

    let mut cities: HashMap<i32, City> = HashMap::new();
    if !city_ids.is_empty() {
        for row in client
            .query(
                "SELECT id, name, region, country FROM cities WHERE id = ANY($1)",
                &[&city_ids],
            )
            .await?
        {
            let city = super::cities::row_to_city(&row);
            cities.insert(city.id, city);
        }
    }

    Ok(companies
        .into_iter()
        .map(|company| CompanyWithRatings {
            category_ratings: ratings.remove(&company.id).unwrap_or_default(),
            industries: industries.remove(&company.id).unwrap_or_default(),
            city: company.city_id.and_then(|id| cities.get(&id).cloned()),
            company,
        })
        .collect())
}

async fn insert_industries(tx: &Transaction<'_>, company_id: i32, industry_ids: &[i32]) -> DbResult<()> {
    tx.execute(
        "INSERT INTO company_industries (company_id, industry_id)
         SELECT $1, UNNEST($2::INTEGER[])
         ON CONFLICT DO NOTHING",
        &[&company_id, &industry_ids],
    )
    .await?;
    Ok(())
}

impl DatabaseService {
    /// Filtered, sorted page of companies plus the total number of matches.
    pub async fn list_companies(
        &self,
        filter: &CompanyFilter,
        industry_ids: Vec<i32>,
    ) -> DbResult<(Vec<CompanyWithRatings>, i64)> {
        let client = self.get_client().await?;
        let page = filter.page();

        let mut qb = QueryBuilder::new();
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let p = qb.bind(format!("%{}%", search));
            qb.push(format!("c.name ILIKE {}", p));
        }
        if !industry_ids.is_empty() {
            let p = qb.bind(industry_ids);
            qb.push(format!(
                "c.id IN (SELECT company_id FROM company_industries WHERE industry_id = ANY({}))",
                p
            ));
        }
        if let Some(size) = filter.size {
            let p = qb.bind(size.as_str().to_string());
            qb.push(format!("c.size = {}", p));
        }
        if let Some(min_rating) = filter.min_rating {
            let p = qb.bind(min_rating);
            qb.push(format!("c.average_rating >= {}", p));
        }
        if let Some(city_id) = filter.city_id {
            let p = qb.bind(city_id);
            qb.push(format!("c.city_id = {}", p));
        }
        if let Some(city) = filter.city.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let p = qb.bind(format!("%{}%", city));
            qb.push(format!("c.city_id IN (SELECT id FROM cities WHERE name ILIKE {})", p));
        }

        let where_clause = qb.where_clause();
        let params = qb.params();

        let count_sql = format!("SELECT COUNT(*) FROM companies c {}", where_clause);
        let total: i64 = client.query_one(count_sql.as_str(), &params).await?.get(0);

        let sort = filter.sort_by.unwrap_or_default();
        let order = filter.sort_order.unwrap_or(match sort {
            CompanySort::Name => SortOrder::Asc,
            _ => SortOrder::Desc,
        });
        let list_sql = format!(
            "SELECT {} FROM companies c {} ORDER BY {} {}, c.id ASC LIMIT {} OFFSET {}",
            COMPANY_COLUMNS,
            where_clause,
            sort.column(),
            order.as_sql(),
            page.limit,
            page.offset()
        );
        let rows = client.query(list_sql.as_str(), &params).await?;
        let companies = rows.iter().map(Self::row_to_company).collect();

        Ok((attach_details(&client, companies).await?, total))
    }

    pub async fn get_company_by_id(&self, id: i32) -> DbResult<Option<CompanyWithRatings>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM companies c WHERE c.id = $1", COMPANY_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        self.company_with_details(&client, row).await
    }

    pub async fn get_company_by_slug(&self, slug: &str) -> DbResult<Option<CompanyWithRatings>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM companies c WHERE c.slug = $1", COMPANY_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&slug]).await?;
        self.company_with_details(&client, row).await
    }

    async fn company_with_details(
        &self,
        client: &Client,
        row: Option<Row>,
    ) -> DbResult<Option<CompanyWithRatings>> {
        let company = match row {
            Some(row) => Self::row_to_company(&row),
            None => return Ok(None),
        };
        Ok(attach_details(client, vec![company]).await?.pop())
    }

    pub async fn company_exists(&self, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let row = client
            .query_one("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)", &[&id])
            .await?;
        Ok(row.get(0))
    }

    /// Inserts the company, its slug and its industries in one transaction.
    pub async fn create_company(&self, req: &CompanyRequest) -> DbResult<CompanyWithRatings> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        // The slug embeds the id, so reserve the id before inserting.
        let id: i32 = tx
            .query_one("SELECT nextval(pg_get_serial_sequence('companies', 'id'))::INTEGER", &[])
            .await?
            .get(0);
        let slug = company_slug(&req.name, id);

        tx.execute(
            "INSERT INTO companies (id, name, slug, size, logo, website, email, phone, address, city_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            &[
                &id,
                &req.name.trim(),
                &slug,
                &req.size.as_str(),
                &req.logo.clone().unwrap_or_default(),
                &req.website.clone().unwrap_or_default(),
                &req.email.clone().unwrap_or_default(),
                &req.phone.clone().unwrap_or_default(),
                &req.address.clone().unwrap_or_default(),
                &req.city_id,
            ],
        )
        .await?;
        insert_industries(&tx, id, &req.industries).await?;
        tx.commit().await?;

        log::info!("Company {} created with slug {}", id, slug);

        let client: &Client = &client;
        let sql = format!("SELECT {} FROM companies c WHERE c.id = $1", COMPANY_COLUMNS);
        let row = client.query_one(sql.as_str(), &[&id]).await?;
        let mut loaded = attach_details(client, vec![Self::row_to_company(&row)]).await?;
        Ok(loaded.remove(0))
    }

    /// Replaces every editable field and the industry set. `None` when the company is missing.
    pub async fn update_company(&self, id: i32, req: &CompanyRequest) -> DbResult<Option<CompanyWithRatings>> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let slug = company_slug(&req.name, id);
        let updated = tx
            .execute(
                "UPDATE companies SET name = $2, slug = $3, size = $4, logo = $5, website = $6,
                    email = $7, phone = $8, address = $9, city_id = $10, updated_at = NOW()
                 WHERE id = $1",
                &[
                    &id,
                    &req.name.trim(),
                    &slug,
                    &req.size.as_str(),
                    &req.logo.clone().unwrap_or_default(),
                    &req.website.clone().unwrap_or_default(),
                    &req.email.clone().unwrap_or_default(),
                    &req.phone.clone().unwrap_or_default(),
                    &req.address.clone().unwrap_or_default(),
                    &req.city_id,
                ],
            )
            .await?;
        if updated == 0 {
            return Ok(None);
        }

        tx.execute("DELETE FROM company_industries WHERE company_id = $1", &[&id])
            .await?;
        insert_industries(&tx, id, &req.industries).await?;
        tx.commit().await?;

        drop(client);
        self.get_company_by_id(id).await
    }

    /// Reviews, marks, industry links and aggregates go with it.
    pub async fn delete_company(&self, id: i32) -> DbResult<bool> {
        let client = self.get_client().await?;
        let deleted = client
            .execute("DELETE FROM companies WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    fn row_to_company(row: &Row) -> Company {
        Company {
            id: row.get(0),
            name: row.get(1),
            slug: row.get(2),
            size: row
                .get::<_, &str>(3)
                .parse()
                .unwrap_or(CompanySize::Small),
            logo: row.get(4),
            website: row.get(5),
            email: row.get(6),
            phone: row.get(7),
            address: row.get(8),
            city_id: row.get(9),
            reviews_count: row.get(10),
            average_rating: row.get(11),
            recommendation_percentage: row.get(12),
            created_at: row.get(13),
            updated_at: row.get(14),
        }
    }
}
