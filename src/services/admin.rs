use std::sync::Arc;

use crate::database::{AdminChange, DatabaseService};
use crate::models::{AdminStatistics, UserProfile, UserRole};
use crate::utils::{AppError, Page, PaginationMeta};

/// User administration and dashboard counters.
pub struct AdminService {
    pub db: Arc<DatabaseService>,
}

impl AdminService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn statistics(&self) -> Result<AdminStatistics, AppError> {
        Ok(self.db.statistics().await?)
    }

    pub async fn list_users(&self, page: Page) -> Result<(Vec<UserProfile>, PaginationMeta), AppError> {
        let (users, total) = self.db.list_users(page).await?;
        Ok((users.iter().map(UserProfile::from).collect(), page.meta(total)))
    }

    pub async fn get_user(&self, id: i32) -> Result<UserProfile, AppError> {
        self.db
            .get_user_by_id(id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn update_role(&self, actor_id: i32, id: i32, role: UserRole) -> Result<UserProfile, AppError> {
        match self.db.update_user_role(id, role).await? {
            AdminChange::Done(user) => {
                log::info!("User {} changed role of user {} to {}", actor_id, id, role);
                Ok(UserProfile::from(&user))
            }
            AdminChange::NotFound => Err(AppError::not_found("User not found")),
            AdminChange::LastAdmin => Err(AppError::bad_request("Cannot demote the last administrator")),
        }
    }

    pub async fn delete_user(&self, actor_id: i32, id: i32) -> Result<(), AppError> {
        if actor_id == id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        match self.db.delete_user(id).await? {
            AdminChange::Done(()) => {
                log::info!("User {} deleted by {}", id, actor_id);
                Ok(())
            }
            AdminChange::NotFound => Err(AppError::not_found("User not found")),
            AdminChange::LastAdmin => Err(AppError::bad_request("Cannot delete the last administrator")),
        }
    }
}
