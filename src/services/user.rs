use std::sync::Arc;

use validator::Validate;

use crate::auth::AuthService;
use crate::database::{DatabaseService, NewUser};
use crate::models::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, PasswordResetIssued, RegisterRequest,
    ResetPasswordRequest, TokenPair, UpdateProfileRequest, User, UserProfile, UserRole,
};
use crate::utils::validation::normalize_phone;
use crate::utils::{mask_sensitive, AppError};

const RESET_ISSUED_MESSAGE: &str =
    "If an account with that email exists, password reset instructions have been sent";

/// Accounts, credentials and tokens.
pub struct UserService {
    pub db: Arc<DatabaseService>,
    pub auth: Arc<AuthService>,
    expose_reset_tokens: bool,
}

impl UserService {
    /// `expose_reset_tokens` echoes reset tokens back to the caller; only for debug mode.
    pub fn new(db: Arc<DatabaseService>, auth: Arc<AuthService>, expose_reset_tokens: bool) -> Self {
        Self {
            db,
            auth,
            expose_reset_tokens,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let password_hash = self.auth.hash_password(&req.password)?;
        let phone = normalize_phone(req.phone.as_deref().unwrap_or_default());
        let user = self
            .db
            .create_user(&NewUser {
                email: &email,
                phone: &phone,
                password_hash: &password_hash,
                first_name: req.first_name.as_deref().unwrap_or_default().trim(),
                last_name: req.last_name.as_deref().unwrap_or_default().trim(),
                role: UserRole::User,
            })
            .await?;

        log::info!("User {} registered ({})", user.id, mask_sensitive(&user.email));
        self.auth_response(&user).await
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;

        let user = match self.db.get_user_by_email(req.email.trim()).await? {
            Some(user) => user,
            None => return Err(AppError::unauthorized("Invalid email or password")),
        };

        if !self.auth.verify_password(&req.password, &user.password_hash)? {
            log::warn!("Failed login for {}", mask_sensitive(&user.email));
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        self.auth_response(&user).await
    }

    /// Exchanges a refresh token for a new pair. The presented token stops working.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let old_hash = self.auth.hash_token(refresh_token);
        let replacement = self.auth.new_refresh_token()?;

        let user = match self.db.rotate_refresh_token(&old_hash, &replacement).await? {
            Some(user) => user,
            None => return Err(AppError::unauthorized("Invalid or expired refresh token")),
        };

        let access_token = self.auth.generate_access_token(&user)?;
        Ok(AuthResponse {
            user: UserProfile::from(&user),
            tokens: TokenPair {
                access_token,
                refresh_token: replacement.plain,
                token_type: "Bearer".to_string(),
                expires_in: self.auth.access_token_ttl_seconds(),
            },
        })
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let removed = self
            .db
            .delete_refresh_token(&self.auth.hash_token(refresh_token))
            .await?;
        if !removed {
            log::debug!("Logout with unknown refresh token");
        }
        Ok(())
    }

    /// Always answers the same way so the endpoint cannot be used to probe for accounts.
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<PasswordResetIssued, AppError> {
        req.validate()?;

        let mut reset_token = None;
        if let Some(user) = self.db.get_user_by_email(req.email.trim()).await? {
            let token = self.auth.new_password_reset_token()?;
            self.db.replace_password_reset_token(user.id, &token).await?;
            log::info!("Password reset requested for user {}", user.id);
            if self.expose_reset_tokens {
                reset_token = Some(token.plain);
            }
        }

        Ok(PasswordResetIssued {
            message: RESET_ISSUED_MESSAGE.to_string(),
            reset_token,
        })
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        req.validate()?;

        let password_hash = self.auth.hash_password(&req.password)?;
        let consumed = self
            .db
            .consume_password_reset_token(&self.auth.hash_token(&req.token), &password_hash)
            .await?;
        if !consumed {
            return Err(AppError::bad_request("Invalid or expired reset token"));
        }
        Ok(())
    }

    pub async fn profile(&self, user_id: i32) -> Result<UserProfile, AppError> {
        let user = self.require_user(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn update_profile(&self, user_id: i32, req: UpdateProfileRequest) -> Result<UserProfile, AppError> {
        req.validate()?;

        let mut user = self.require_user(user_id).await?;
        if let Some(phone) = &req.phone {
            user.phone = normalize_phone(phone);
        }
        if let Some(first_name) = &req.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &req.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(password) = &req.password {
            user.password_hash = self.auth.hash_password(password)?;
        }

        let user = self.db.update_user(&user).await?;
        Ok(UserProfile::from(&user))
    }

    async fn require_user(&self, user_id: i32) -> Result<User, AppError> {
        self.db
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn auth_response(&self, user: &User) -> Result<AuthResponse, AppError> {
        let access_token = self.auth.generate_access_token(user)?;
        let refresh = self.auth.new_refresh_token()?;
        self.db.store_refresh_token(user.id, &refresh).await?;

        Ok(AuthResponse {
            user: UserProfile::from(user),
            tokens: TokenPair {
                access_token,
                refresh_token: refresh.plain,
                token_type: "Bearer".to_string(),
                expires_in: self.auth.access_token_ttl_seconds(),
            },
        })
    }
}
