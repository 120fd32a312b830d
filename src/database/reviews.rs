use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tokio_postgres::{Client, Row};

use super::companies::recompute_company_rating;
use super::{DatabaseService, DbResult, QueryBuilder};
use crate::models::{
    AdminReviewUpdate, City, CompanySummary, LookupItem, Review, ReviewBenefit,
    ReviewCategoryRating, ReviewFilter, ReviewRequest, ReviewScope, ReviewStatus,
    ReviewWithDetails, UsefulMarkResponse,
};
use crate::utils::SortOrder;

const REVIEW_COLUMNS: &str = "r.id, r.user_id, r.company_id, r.position, r.employment_type_id, \
     r.employment_period_id, r.city_id, r.rating, r.pros, r.cons, r.is_former_employee, \
     r.is_recommended, r.status, r.moderation_comment, r.useful_count, r.created_at, \
     r.updated_at, r.approved_at";

/// Result of a state change that is only legal from some statuses.
#[derive(Debug)]
pub enum ReviewTransition {
    Done(Review),
    NotFound,
    /// The review is not pending; carries the status it is in.
    NotPending(ReviewStatus),
}

#[derive(Debug)]
pub enum UsefulMarkChange {
    Done(UsefulMarkResponse),
    ReviewNotFound,
    NotMarked,
}

fn row_to_review(row: &Row) -> Review {
    Review {
        id: row.get(0),
        user_id: row.get(1),
        company_id: row.get(2),
        position: row.get(3),
        employment_type_id: row.get(4),
        employment_period_id: row.get(5),
        city_id: row.get(6),
        rating: row.get(7),
        pros: row.get(8),
        cons: row.get(9),
        is_former_employee: row.get(10),
        is_recommended: row.get(11),
        status: row
            .get::<_, &str>(12)
            .parse()
            .unwrap_or(ReviewStatus::Pending),
        moderation_comment: row.get(13),
        useful_count: row.get(14),
        created_at: row.get(15),
        updated_at: row.get(16),
        approved_at: row.get(17),
    }
}

async fn lookup_map(client: &Client, table: &str, ids: &[i32]) -> DbResult<HashMap<i32, LookupItem>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!("SELECT id, name, description FROM {} WHERE id = ANY($1)", table);
    let rows = client.query(sql.as_str(), &[&ids]).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let item = LookupItem {
                id: row.get(0),
                name: row.get(1),
                description: row.get(2),
            };
            (item.id, item)
        })
        .collect())
}

/// Batch-loads everything a review card shows. `viewer` decides `is_marked_as_useful`.
async fn attach_details(
    client: &Client,
    reviews: Vec<Review>,
    viewer: Option<i32>,
) -> DbResult<Vec<ReviewWithDetails>> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = reviews.iter().map(|r| r.id).collect();
    let company_ids: Vec<i32> = reviews.iter().map(|r| r.company_id).collect();
    let city_ids: Vec<i32> = reviews.iter().filter_map(|r| r.city_id).collect();
    let type_ids: Vec<i32> = reviews.iter().filter_map(|r| r.employment_type_id).collect();
    let period_ids: Vec<i32> = reviews.iter().filter_map(|r| r.employment_period_id).collect();

    let mut ratings: HashMap<i32, Vec<ReviewCategoryRating>> = HashMap::new();
    for row in client
        .query(
            "SELECT rcr.review_id, rc.id, rc.name, rcr.rating
             FROM review_category_ratings rcr
             JOIN rating_categories rc ON rc.id = rcr.category_id
             WHERE rcr.review_id = ANY($1)
             ORDER BY rc.id",
            &[&ids],
        )
        .await?
    {
        ratings.entry(row.get(0)).or_default().push(ReviewCategoryRating {
            category_id: row.get(1),
            category: row.get(2),
            rating: row.get(3),
        });
    }

    let mut benefits: HashMap<i32, Vec<ReviewBenefit>> = HashMap::new();
    for row in client
        .query(
            "SELECT rb.review_id, bt.id, bt.name
             FROM review_benefits rb
             JOIN benefit_types bt ON bt.id = rb.benefit_type_id
             WHERE rb.review_id = ANY($1)
             ORDER BY bt.name",
            &[&ids],
        )
        .await?
    {
        benefits.entry(row.get(0)).or_default().push(ReviewBenefit {
            benefit_type_id: row.get(1),
            benefit: row.get(2),
        });
    }

    let companies: HashMap<i32, CompanySummary> = client
        .query(
            "SELECT id, name, slug FROM companies WHERE id = ANY($1)",
            &[&company_ids],
        )
        .await?
        .iter()
        .map(|row| {
            let c = CompanySummary {
                id: row.get(0),
                name: row.get(1),
                slug: row.get(2),
            };
            (c.id, c)
        })
        .collect();

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

    let types = lookup_map(client, "employment_types", &type_ids).await?;
    let periods = lookup_map(client, "employment_periods", &period_ids).await?;

    let marked: HashSet<i32> = match viewer {
        Some(user_id) => client
            .query(
                "SELECT review_id FROM useful_marks WHERE user_id = $1 AND review_id = ANY($2)",
                &[&user_id, &ids],
            )
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect(),
        None => HashSet::new(),
    };

    Ok(reviews
        .into_iter()
        .map(|review| ReviewWithDetails {
            category_ratings: ratings.remove(&review.id).unwrap_or_default(),
            benefits: benefits.remove(&review.id).unwrap_or_default(),
            company: companies.get(&review.company_id).cloned(),
            city: review.city_id.and_then(|id| cities.get(&id).cloned()),
            employment_type: review.employment_type_id.and_then(|id| types.get(&id).cloned()),
            employment_period: review.employment_period_id.and_then(|id| periods.get(&id).cloned()),
            is_marked_as_useful: marked.contains(&review.id),
            review,
        })
        .collect())
}

impl DatabaseService {
    /// A single review with details. With `approved_only`, anything else reads as missing.
    pub async fn get_review_details(
        &self,
        id: i32,
        viewer: Option<i32>,
        approved_only: bool,
    ) -> DbResult<Option<ReviewWithDetails>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM reviews r WHERE r.id = $1", REVIEW_COLUMNS);
        let review = match client.query_opt(sql.as_str(), &[&id]).await? {
            Some(row) => row_to_review(&row),
            None => return Ok(None),
        };
        if approved_only && review.status != ReviewStatus::Approved {
            return Ok(None);
        }
        Ok(attach_details(&client, vec![review], viewer).await?.pop())
    }

    pub async fn list_reviews(
        &self,
        scope: ReviewScope,
        filter: &ReviewFilter,
        viewer: Option<i32>,
    ) -> DbResult<(Vec<ReviewWithDetails>, i64)> {
        let client = self.get_client().await?;
        let page = filter.page();

        let mut qb = QueryBuilder::new();
        let default_order = match scope {
            ReviewScope::Company(company_id) => {
                let p = qb.bind(company_id);
                qb.push(format!("r.company_id = {}", p));
                qb.push("r.status = 'approved'".to_string());
                SortOrder::Desc
            }
            ReviewScope::Author(user_id) => {
                let p = qb.bind(user_id);
                qb.push(format!("r.user_id = {}", p));
                SortOrder::Desc
            }
            ReviewScope::Status(status) => {
                let p = qb.bind(status.as_str().to_string());
                qb.push(format!("r.status = {}", p));
                // The moderation queue is worked oldest first.
                if status == ReviewStatus::Pending {
                    SortOrder::Asc
                } else {
                    SortOrder::Desc
                }
            }
        };

        if let Some(city_id) = filter.city_id {
            let p = qb.bind(city_id);
            qb.push(format!("r.city_id = {}", p));
        }
        if let Some(min) = filter.min_rating {
            let p = qb.bind(min);
            qb.push(format!("r.rating >= {}", p));
        }
        if let Some(max) = filter.max_rating {
            let p = qb.bind(max);
            qb.push(format!("r.rating <= {}", p));
        }
        if let Some(former) = filter.is_former_employee {
            let p = qb.bind(former);
            qb.push(format!("r.is_former_employee = {}", p));
        }

        let where_clause = qb.where_clause();
        let params = qb.params();

        let count_sql = format!("SELECT COUNT(*) FROM reviews r {}", where_clause);
        let total: i64 = client.query_one(count_sql.as_str(), &params).await?.get(0);

        let sql = format!(
            "SELECT {} FROM reviews r {} ORDER BY {} {}, r.id LIMIT {} OFFSET {}",
            REVIEW_COLUMNS,
            where_clause,
            filter.sort_by.unwrap_or_default().column(),
            filter.sort_order.unwrap_or(default_order).as_sql(),
            page.limit,
            page.offset()
        );
        let rows = client.query(sql.as_str(), &params).await?;
        let reviews = rows.iter().map(row_to_review).collect();

        Ok((attach_details(&client, reviews, viewer).await?, total))
    }

    /// Inserts a pending review with its category ratings and benefits in one transaction.
    pub async fn create_review(&self, user_id: i32, req: &ReviewRequest, rating: f64) -> DbResult<Review> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let sql = format!(
            "INSERT INTO reviews AS r (user_id, company_id, position, employment_type_id,
                employment_period_id, city_id, rating, pros, cons, is_former_employee, is_recommended)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            REVIEW_COLUMNS
        );
        let row = tx
            .query_one(
                sql.as_str(),
                &[
                    &user_id,
                    &req.company_id,
                    &req.position.trim(),
                    &req.employment_type_id,
                    &req.employment_period_id,
                    &req.city_id,
                    &rating,
                    &req.pros.trim(),
                    &req.cons.trim(),
                    &req.is_former_employee,
                    &req.is_recommended,
                ],
            )
            .await?;
        let review = row_to_review(&row);

        let rating_stmt = tx
            .prepare(
                "INSERT INTO review_category_ratings (review_id, category_id, rating) VALUES ($1, $2, $3)",
            )
            .await?;
        for (category_id, score) in &req.category_ratings {
            tx.execute(&rating_stmt, &[&review.id, category_id, score]).await?;
        }

        if !req.benefit_type_ids.is_empty() {
            tx.execute(
                "INSERT INTO review_benefits (review_id, benefit_type_id)
                 SELECT $1, UNNEST($2::INTEGER[])
                 ON CONFLICT DO NOTHING",
                &[&review.id, &req.benefit_type_ids],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(review)
    }

    /// Moves a pending review to `target`. Approval refreshes the company aggregates in
    /// the same transaction.
    pub async fn moderate_review(
        &self,
        id: i32,
        target: ReviewStatus,
        comment: Option<&str>,
    ) -> DbResult<ReviewTransition> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let select = format!("SELECT {} FROM reviews r WHERE r.id = $1 FOR UPDATE", REVIEW_COLUMNS);
        let current = match tx.query_opt(select.as_str(), &[&id]).await? {
            Some(row) => row_to_review(&row),
            None => return Ok(ReviewTransition::NotFound),
        };
        if !current.status.can_moderate() {
            return Ok(ReviewTransition::NotPending(current.status));
        }

        let update = format!(
            "UPDATE reviews r SET status = $2,
                moderation_comment = COALESCE($3, r.moderation_comment),
                approved_at = CASE WHEN $4 THEN NOW() ELSE r.approved_at END,
                updated_at = NOW()
             WHERE r.id = $1
             RETURNING {}",
            REVIEW_COLUMNS
        );
        let row = tx
            .query_one(
                update.as_str(),
                &[&id, &target.as_str(), &comment, &(target == ReviewStatus::Approved)],
            )
            .await?;
        let review = row_to_review(&row);

        if target == ReviewStatus::Approved {
            recompute_company_rating(&tx, review.company_id).await?;
        }
        tx.commit().await?;

        log::info!("Review {} moved to {}", id, target);
        Ok(ReviewTransition::Done(review))
    }

    /// Applies an admin patch. Aggregates are rebuilt when the review counted before or
    /// counts after the change.
    pub async fn admin_update_review(&self, id: i32, patch: &AdminReviewUpdate) -> DbResult<Option<Review>> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let select = format!("SELECT {} FROM reviews r WHERE r.id = $1 FOR UPDATE", REVIEW_COLUMNS);
        let mut review = match tx.query_opt(select.as_str(), &[&id]).await? {
            Some(row) => row_to_review(&row),
            None => return Ok(None),
        };
        let was_approved = review.status == ReviewStatus::Approved;
        patch.apply(&mut review, Utc::now());

        tx.execute(
            "UPDATE reviews SET position = $2, rating = $3, pros = $4, cons = $5,
                is_former_employee = $6, is_recommended = $7, status = $8,
                moderation_comment = $9, approved_at = $10, updated_at = $11
             WHERE id = $1",
            &[
                &review.id,
                &review.position,
                &review.rating,
                &review.pros,
                &review.cons,
                &review.is_former_employee,
                &review.is_recommended,
                &review.status.as_str(),
                &review.moderation_comment,
                &review.approved_at,
                &review.updated_at,
            ],
        )
        .await?;

        if was_approved || review.status == ReviewStatus::Approved {
            recompute_company_rating(&tx, review.company_id).await?;
        }
        tx.commit().await?;

        Ok(Some(review))
    }

    pub async fn admin_delete_review(&self, id: i32) -> DbResult<bool> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let company_id: i32 = match tx
            .query_opt("DELETE FROM reviews WHERE id = $1 RETURNING company_id", &[&id])
            .await?
        {
            Some(row) => row.get(0),
            None => return Ok(false),
        };
        recompute_company_rating(&tx, company_id).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Marks an approved review useful. Repeating the call changes nothing.
    pub async fn add_useful_mark(&self, user_id: i32, review_id: i32) -> DbResult<UsefulMarkChange> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let approved = tx
            .query_opt(
                "SELECT id FROM reviews WHERE id = $1 AND status = 'approved' FOR UPDATE",
                &[&review_id],
            )
            .await?;
        if approved.is_none() {
            return Ok(UsefulMarkChange::ReviewNotFound);
        }

        let inserted = tx
            .execute(
                "INSERT INTO useful_marks (user_id, review_id) VALUES ($1, $2)
                 ON CONFLICT (user_id, review_id) DO NOTHING",
                &[&user_id, &review_id],
            )
            .await?;
        if inserted > 0 {
            tx.execute(
                "UPDATE reviews SET useful_count = useful_count + 1 WHERE id = $1",
                &[&review_id],
            )
            .await?;
        }

        let count: i32 = tx
            .query_one("SELECT useful_count FROM reviews WHERE id = $1", &[&review_id])
            .await?
            .get(0);
        tx.commit().await?;

        Ok(UsefulMarkChange::Done(UsefulMarkResponse {
            review_id,
            useful_count: count,
            is_marked_as_useful: true,
        }))
    }

    pub async fn remove_useful_mark(&self, user_id: i32, review_id: i32) -> DbResult<UsefulMarkChange> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let exists = tx
            .query_opt("SELECT id FROM reviews WHERE id = $1 FOR UPDATE", &[&review_id])
            .await?;
        if exists.is_none() {
            return Ok(UsefulMarkChange::ReviewNotFound);
        }

        let deleted = tx
            .execute(
                "DELETE FROM useful_marks WHERE user_id = $1 AND review_id = $2",
                &[&user_id, &review_id],
            )
            .await?;
        if deleted == 0 {
            return Ok(UsefulMarkChange::NotMarked);
        }

        let count: i32 = tx
            .query_one(
                "UPDATE reviews SET useful_count = GREATEST(useful_count - 1, 0) WHERE id = $1
                 RETURNING useful_count",
                &[&review_id],
            )
            .await?
            .get(0);
        tx.commit().await?;

        Ok(UsefulMarkChange::Done(UsefulMarkResponse {
            review_id,
            useful_count: count,
            is_marked_as_useful: false,
        }))
    }
}
