#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use jobsolution_api::auth::AuthService;
use jobsolution_api::config::{AuthConfig, DatabaseConfig};
use jobsolution_api::database::DatabaseService;
use jobsolution_api::models::{User, UserRole};
use jobsolution_api::services::{
    AdminService, CompanyService, ReferenceService, ReviewService, SuggestionService, UserService,
};

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_seconds: 7 * 24 * 3600,
        password_reset_ttl_seconds: 24 * 3600,
        bcrypt_cost: 4,
    }
}

pub fn database_config(url: Option<String>) -> DatabaseConfig {
    DatabaseConfig {
        url,
        host: "127.0.0.1".to_string(),
        port: 1,
        user: "postgres".to_string(),
        password: "postgres".to_string(),
        dbname: "jobsolution_test".to_string(),
        sslmode: "disable".to_string(),
        max_connections: 4,
        migrations_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/migrations").to_string(),
    }
}

/// Every service wired to one database handle.
pub struct Services {
    pub db: Arc<DatabaseService>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub companies: Arc<CompanyService>,
    pub reviews: Arc<ReviewService>,
    pub reference: Arc<ReferenceService>,
    pub admin: Arc<AdminService>,
    pub suggestions: Arc<SuggestionService>,
}

impl Services {
    pub fn new(db: DatabaseService) -> Self {
        let db = Arc::new(db);
        let auth = Arc::new(AuthService::new(auth_config()));
        Self {
            users: Arc::new(UserService::new(Arc::clone(&db), Arc::clone(&auth), true)),
            companies: Arc::new(CompanyService::new(Arc::clone(&db))),
            reviews: Arc::new(ReviewService::new(Arc::clone(&db))),
            reference: Arc::new(ReferenceService::new(Arc::clone(&db))),
            admin: Arc::new(AdminService::new(Arc::clone(&db))),
            suggestions: Arc::new(SuggestionService::new(Arc::clone(&db))),
            db,
            auth,
        }
    }

    /// Services over a pool that points at a closed port; nothing connects until a query runs.
    pub fn offline() -> Self {
        let db = DatabaseService::connect_lazy(&database_config(None)).expect("pool config");
        Self::new(db)
    }
}

/// Connects to `DATABASE_URL` and applies the migrations, or returns `None`
/// so the caller can skip.
pub async fn database() -> Option<Services> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(v) if !v.is_empty() => v,
        _ => {
            eprintln!("Skipping test: DATABASE_URL not set");
            return None;
        }
    };

    let config = database_config(Some(url));
    let db = DatabaseService::new(&config).await.expect("db init");
    db.run_migrations(&config.migrations_dir).await.expect("migrations");
    Some(Services::new(db))
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub fn fake_user(id: i32, role: UserRole) -> User {
    User {
        id,
        email: format!("user{}@example.com", id),
        phone: String::new(),
        password_hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        role,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn bearer(auth: &AuthService, id: i32, role: UserRole) -> (String, String) {
    let token = auth
        .generate_access_token(&fake_user(id, role))
        .expect("token");
    ("Authorization".to_string(), format!("Bearer {}", token))
}
