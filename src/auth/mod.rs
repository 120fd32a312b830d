use actix_web::HttpMessage;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::{User, UserRole};
use crate::utils::{self, AppError};

const ISSUER: &str = "jobsolution-api";
const OPAQUE_TOKEN_BYTES: usize = 32;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub iss: String,
    pub jti: String,
}

impl Claims {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// A freshly minted opaque token. Only `hash` is persisted.
#[derive(Debug, Clone)]
pub struct OpaqueToken {
    pub plain: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Hash a password using bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(password, self.config.bcrypt_cost)
    }

    /// Verify a password against its hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(password, hash)
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.config.access_token_ttl_seconds
    }

    /// Signs an HS256 access token for `user`.
    pub fn generate_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (now + Duration::seconds(self.config.access_token_ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iat", "nbf"]);
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Hash a token for storage (using SHA-256)
    pub fn hash_token(&self, token: &str) -> String {
        utils::hash_string(token)
    }

    pub fn new_refresh_token(&self) -> Result<OpaqueToken, AppError> {
        self.new_opaque_token(self.config.refresh_token_ttl_seconds)
    }

    pub fn new_password_reset_token(&self) -> Result<OpaqueToken, AppError> {
        self.new_opaque_token(self.config.password_reset_ttl_seconds)
    }

    fn new_opaque_token(&self, ttl_seconds: i64) -> Result<OpaqueToken, AppError> {
        let plain = utils::generate_token(OPAQUE_TOKEN_BYTES)?;
        Ok(OpaqueToken {
            hash: self.hash_token(&plain),
            plain,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Extract token from request headers
pub fn extract_token_from_request(req: &impl HttpMessage) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(ttl: i64) -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "unit-test-secret".into(),
            access_token_ttl_seconds: ttl,
            refresh_token_ttl_seconds: 3600,
            password_reset_ttl_seconds: 3600,
            bcrypt_cost: 4,
        })
    }

    fn user(role: UserRole) -> User {
        User {
            id: 17,
            email: "anna@example.com".into(),
            phone: String::new(),
            password_hash: String::new(),
            first_name: "Anna".into(),
            last_name: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let auth = service(3600);
        let token = auth.generate_access_token(&user(UserRole::Moderator)).unwrap();
        let claims = auth.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id, 17);
        assert_eq!(claims.sub, "17");
        assert_eq!(claims.role, UserRole::Moderator);
        assert!(claims.is_staff());
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let expired = service(-3600).generate_access_token(&user(UserRole::User)).unwrap();
        assert!(service(3600).validate_access_token(&expired).is_err());

        let other = AuthService::new(AuthConfig {
            jwt_secret: "another-secret".into(),
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 3600,
            password_reset_ttl_seconds: 3600,
            bcrypt_cost: 4,
        });
        let foreign = other.generate_access_token(&user(UserRole::Admin)).unwrap();
        assert!(service(3600).validate_access_token(&foreign).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let auth = service(60);
        let hash = auth.hash_password("correct horse").unwrap();
        assert!(auth.verify_password("correct horse", &hash).unwrap());
        assert!(!auth.verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn opaque_tokens_store_only_the_digest() {
        let auth = service(60);
        let token = auth.new_refresh_token().unwrap();
        assert_ne!(token.plain, token.hash);
        assert_eq!(auth.hash_token(&token.plain), token.hash);
        assert!(token.expires_at > Utc::now());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("bearer xyz"), Some("xyz"));
        assert_eq!(extract_bearer_token("Basic Zm9v"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Bearer"), None);
    }
}
