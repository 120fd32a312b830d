pub mod admin;
pub mod auth;
pub mod companies;
pub mod reference;
pub mod reviews;
pub mod suggestions;
pub mod users;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::database::DatabaseService;
use crate::middleware::{AuthMiddleware, RequireRole};
use crate::models::{HealthResponse, LookupKind};
use crate::utils::{response, AppError};

/// Liveness probe, including a database round trip.
pub async fn health_check(db: web::Data<Arc<DatabaseService>>) -> HttpResponse {
    let (status, database, code) = match db.ping().await {
        Ok(()) => ("healthy", "connected", StatusCode::OK),
        Err(e) => {
            log::error!("Health check database ping failed: {}", e);
            ("unhealthy", "unavailable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    response::json_response(
        HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
            timestamp: chrono::Utc::now(),
        },
        code,
    )
}

/// Server status endpoint
pub async fn server_status() -> HttpResponse {
    response::success_response(serde_json::json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("Invalid request body")
        .with_details(vec![err.to_string()])
        .into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("Invalid query parameters")
        .with_details(vec![err.to_string()])
        .into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("Invalid path parameter")
        .with_details(vec![err.to_string()])
        .into()
}

/// Registers the whole HTTP surface: `/health` plus the same API tree under
/// `/api/v1` and `/api`.
pub fn configure(cfg: &mut web::ServiceConfig, auth: Arc<AuthService>) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/health", web::get().to(health_check));

    // "/api/v1" must be registered first, the "/api" scope would swallow it otherwise.
    let v1 = Arc::clone(&auth);
    cfg.service(web::scope("/api/v1").configure(move |c| api_routes(c, &v1)));
    cfg.service(web::scope("/api").configure(move |c| api_routes(c, &auth)));
}

fn api_routes(cfg: &mut web::ServiceConfig, auth: &Arc<AuthService>) {
    cfg.route("/status", web::get().to(server_status))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/refresh", web::post().to(auth::refresh))
                .route("/logout", web::post().to(auth::logout))
                .route("/forgot-password", web::post().to(auth::forgot_password))
                .route("/reset-password", web::post().to(auth::reset_password)),
        )
        .service(
            web::scope("/users")
                .wrap(AuthMiddleware::required(Arc::clone(auth)))
                .route("/me", web::get().to(users::me))
                .route("/me", web::put().to(users::update_me))
                .route("/me/reviews", web::get().to(users::my_reviews)),
        )
        .service(
            web::scope("/companies")
                .wrap(AuthMiddleware::optional(Arc::clone(auth)))
                .route("", web::get().to(companies::list))
                .route("/{id_or_slug}", web::get().to(companies::get)),
        )
        .service(
            web::scope("/reviews")
                .wrap(AuthMiddleware::optional(Arc::clone(auth)))
                .route("", web::post().to(reviews::create))
                .route("/company/{company_id}", web::get().to(reviews::list_for_company))
                .route("/{id}", web::get().to(reviews::get))
                .route("/{id}/useful", web::post().to(reviews::mark_useful))
                .route("/{id}/useful", web::delete().to(reviews::unmark_useful)),
        )
        .service(
            web::scope("/cities")
                .route("", web::get().to(reference::list_cities))
                .route("/search", web::get().to(reference::search_cities))
                .route("/{id}", web::get().to(reference::get_city)),
        )
        .service(
            web::scope("/industries")
                .route("", web::get().to(reference::list_industries))
                .route("/company/{id}", web::get().to(companies::industries))
                .route("/{id}", web::get().to(reference::get_industry))
                .service(
                    web::resource("/{id}/color")
                        .wrap(RequireRole::admin())
                        .wrap(AuthMiddleware::required(Arc::clone(auth)))
                        .route(web::put().to(reference::update_industry_color)),
                ),
        );

    for kind in LOOKUPS {
        cfg.service(
            web::scope(lookup_path(kind))
                .app_data(web::Data::new(kind))
                .route("", web::get().to(reference::list_lookup))
                .route("/{id}", web::get().to(reference::get_lookup)),
        );
    }

    cfg.route("/suggestions", web::post().to(suggestions::submit));
    admin_routes(cfg, auth);
}

const LOOKUPS: [LookupKind; 4] = [
    LookupKind::RatingCategory,
    LookupKind::BenefitType,
    LookupKind::EmploymentType,
    LookupKind::EmploymentPeriod,
];

fn lookup_path(kind: LookupKind) -> &'static str {
    match kind {
        LookupKind::RatingCategory => "/rating-categories",
        LookupKind::BenefitType => "/benefit-types",
        LookupKind::EmploymentType => "/employment-types",
        LookupKind::EmploymentPeriod => "/employment-periods",
    }
}

/// Moderation is open to moderators and admins; everything else under
/// `/admin` needs the admin role.
fn admin_routes(cfg: &mut web::ServiceConfig, auth: &Arc<AuthService>) {
    let mut admin_only = web::scope("")
        .wrap(RequireRole::admin())
        .route("/statistics", web::get().to(admin::statistics))
        .route("/users", web::get().to(admin::list_users))
        .route("/users/{id}", web::get().to(admin::get_user))
        .route("/users/{id}", web::delete().to(admin::delete_user))
        .route("/users/{id}/role", web::put().to(admin::update_role))
        .route("/companies", web::post().to(companies::create))
        .route("/companies/{id}", web::put().to(companies::update))
        .route("/companies/{id}", web::delete().to(companies::delete))
        .route("/reviews/{id}", web::put().to(reviews::admin_update))
        .route("/reviews/{id}", web::delete().to(reviews::admin_delete))
        .route("/cities", web::post().to(reference::create_city))
        .route("/cities/{id}", web::put().to(reference::update_city))
        .route("/cities/{id}", web::delete().to(reference::delete_city))
        .route("/industries", web::post().to(reference::create_industry))
        .route("/industries/{id}", web::put().to(reference::update_industry))
        .route("/industries/{id}", web::delete().to(reference::delete_industry))
        .route("/suggestions", web::get().to(suggestions::list))
        .route("/suggestions/{id}", web::delete().to(suggestions::delete));

    for kind in LOOKUPS {
        admin_only = admin_only.service(
            web::scope(lookup_path(kind))
                .app_data(web::Data::new(kind))
                .route("", web::post().to(reference::create_lookup))
                .route("/{id}", web::put().to(reference::update_lookup))
                .route("/{id}", web::delete().to(reference::delete_lookup)),
        );
    }

    cfg.service(
        web::scope("/admin")
            .wrap(RequireRole::staff())
            .wrap(AuthMiddleware::required(Arc::clone(auth)))
            .route("/reviews/moderation/{status}", web::get().to(reviews::moderation_queue))
            .route("/reviews/{id}/approve", web::put().to(reviews::approve))
            .route("/reviews/{id}/reject", web::put().to(reviews::reject))
            .service(admin_only),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as atest, App};

    #[actix_rt::test]
    async fn status_reports_version() {
        let app = atest::init_service(App::new().route("/status", web::get().to(server_status))).await;
        let req = atest::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn every_lookup_has_a_distinct_path() {
        let mut paths: Vec<_> = LOOKUPS.iter().map(|k| lookup_path(*k)).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), LOOKUPS.len());
    }
}
