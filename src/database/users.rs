use tokio_postgres::Row;

use super::companies::recompute_company_rating;
use super::{DatabaseService, DbResult};
use crate::models::{User, UserRole};
use crate::utils::Page;

const USER_COLUMNS: &str =
    "id, email, phone, password_hash, first_name, last_name, role, created_at, updated_at";

/// Outcome of an admin operation protected by the last-admin rule.
#[derive(Debug)]
pub enum AdminChange<T> {
    Done(T),
    NotFound,
    LastAdmin,
}

/// Fields written when creating a user.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: UserRole,
}

impl DatabaseService {
    pub async fn create_user(&self, user: &NewUser<'_>) -> DbResult<User> {
        let client = self.get_client().await?;
        let sql = format!(
            "INSERT INTO users (email, phone, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &user.email,
                    &user.phone,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    &user.role.as_str(),
                ],
            )
            .await?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn get_user_by_id(&self, id: i32) -> DbResult<Option<User>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(Self::row_to_user))
    }

    /// Emails are matched case-insensitively.
    pub async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&email]).await?;
        Ok(row.as_ref().map(Self::row_to_user))
    }

    /// Writes the profile fields and password hash back; `updated_at` is set by the database.
    pub async fn update_user(&self, user: &User) -> DbResult<User> {
        let client = self.get_client().await?;
        let sql = format!(
            "UPDATE users
             SET phone = $2, first_name = $3, last_name = $4, password_hash = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &user.id,
                    &user.phone,
                    &user.first_name,
                    &user.last_name,
                    &user.password_hash,
                ],
            )
            .await?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn list_users(&self, page: Page) -> DbResult<(Vec<User>, i64)> {
        let client = self.get_client().await?;
        let total: i64 = client
            .query_one("SELECT COUNT(*) FROM users", &[])
            .await?
            .get(0);
        let sql = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = client
            .query(sql.as_str(), &[&page.limit, &page.offset()])
            .await?;
        Ok((rows.iter().map(Self::row_to_user).collect(), total))
    }

    /// Changes a role. Demoting the only admin is refused.
    pub async fn update_user_role(&self, id: i32, role: UserRole) -> DbResult<AdminChange<User>> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        // Lock every admin row so two concurrent demotions cannot both pass the check.
        let admins: Vec<i32> = tx
            .query("SELECT id FROM users WHERE role = 'admin' FOR UPDATE", &[])
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();

        let current = tx
            .query_opt("SELECT role FROM users WHERE id = $1 FOR UPDATE", &[&id])
            .await?;
        let current_role: String = match current {
            Some(row) => row.get(0),
            None => return Ok(AdminChange::NotFound),
        };

        if current_role == UserRole::Admin.as_str()
            && role != UserRole::Admin
            && admins.len() <= 1
        {
            return Ok(AdminChange::LastAdmin);
        }

        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = tx.query_one(sql.as_str(), &[&id, &role.as_str()]).await?;
        tx.commit().await?;

        Ok(AdminChange::Done(Self::row_to_user(&row)))
    }

    /// Deletes a user with their reviews, marks and tokens, then refreshes the ratings
    /// of every company that lost an approved review.
    pub async fn delete_user(&self, id: i32) -> DbResult<AdminChange<()>> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let admins: Vec<i32> = tx
            .query("SELECT id FROM users WHERE role = 'admin' FOR UPDATE", &[])
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();

        let role: String = match tx
            .query_opt("SELECT role FROM users WHERE id = $1 FOR UPDATE", &[&id])
            .await?
        {
            Some(row) => row.get(0),
            None => return Ok(AdminChange::NotFound),
        };

        if role == UserRole::Admin.as_str() && admins.len() <= 1 {
            return Ok(AdminChange::LastAdmin);
        }

        let affected: Vec<i32> = tx
            .query(
                "SELECT DISTINCT company_id FROM reviews WHERE user_id = $1 AND status = 'approved'",
                &[&id],
            )
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();

        // Marks the user placed on other people's reviews disappear with the cascade,
        // so the counters they fed are rebuilt from what remains.
        tx.execute(
            "UPDATE reviews r SET useful_count = useful_count - 1
             FROM useful_marks m
             WHERE m.review_id = r.id AND m.user_id = $1 AND r.user_id <> $1",
            &[&id],
        )
        .await?;

        tx.execute("DELETE FROM users WHERE id = $1", &[&id]).await?;

        for company_id in affected {
            recompute_company_rating(&tx, company_id).await?;
        }

        tx.commit().await?;
        Ok(AdminChange::Done(()))
    }

    fn row_to_user(row: &Row) -> User {
        User {
            id: row.get(0),
            email: row.get(1),
            phone: row.get(2),
            password_hash: row.get(3),
            first_name: row.get(4),
            last_name: row.get(5),
            role: row.get::<_, &str>(6).parse().unwrap_or(UserRole::User),
            created_at: row.get(7),
            updated_at: row.get(8),
        }
    }
}
