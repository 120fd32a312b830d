//! Routing, middleware and extractor behaviour that never reaches the database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{header, Method, StatusCode};
use actix_web::{test, web, App};
use serde_json::Value;

use common::{bearer, Services};
use jobsolution_api::handlers;
use jobsolution_api::middleware::{create_rate_limiter, CorsMiddleware, RateLimitMiddleware};
use jobsolution_api::models::UserRole;

const ORIGIN: &str = "https://jobsolution.example";

macro_rules! test_app {
    ($services:expr) => {{
        let s = &$services;
        let auth = Arc::clone(&s.auth);
        test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::clone(&s.db)))
                .app_data(web::Data::new(Arc::clone(&s.users)))
                .app_data(web::Data::new(Arc::clone(&s.companies)))
                .app_data(web::Data::new(Arc::clone(&s.reviews)))
                .app_data(web::Data::new(Arc::clone(&s.reference)))
                .app_data(web::Data::new(Arc::clone(&s.admin)))
                .app_data(web::Data::new(Arc::clone(&s.suggestions)))
                .wrap(CorsMiddleware::new(vec![ORIGIN.to_string()]))
                .configure(move |cfg| handlers::configure(cfg, auth)),
        )
        .await
    }};
}

#[actix_rt::test]
async fn protected_routes_require_a_token_under_both_prefixes() {
    let services = Services::offline();
    let app = test_app!(services);

    for uri in ["/api/users/me", "/api/v1/users/me", "/api/admin/statistics"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]["message"].is_string());
    }
}

#[actix_rt::test]
async fn garbage_token_is_rejected() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn admin_routes_check_the_role() {
    let services = Services::offline();
    let app = test_app!(services);

    let user = bearer(&services.auth, 10, UserRole::User);
    let req = test::TestRequest::get()
        .uri("/api/admin/reviews/moderation/pending")
        .insert_header(user)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // moderators may moderate but not administer
    let moderator = bearer(&services.auth, 11, UserRole::Moderator);
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/statistics")
        .insert_header(moderator.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/admin/companies/1")
        .insert_header(moderator)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn industry_color_needs_an_admin() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::put()
        .uri("/api/industries/3/color")
        .set_json(serde_json::json!({ "color": "#fff" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::put()
        .uri("/api/industries/3/color")
        .insert_header(bearer(&services.auth, 12, UserRole::Moderator))
        .set_json(serde_json::json!({ "color": "#fff" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn unknown_moderation_status_is_not_found() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::get()
        .uri("/api/admin/reviews/moderation/archived")
        .insert_header(bearer(&services.auth, 13, UserRole::Moderator))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn malformed_input_gets_the_error_envelope() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"], "Invalid request body");

    let req = test::TestRequest::get().uri("/api/reviews/abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn registration_is_validated_before_touching_the_database() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(serde_json::json!({
            "email": "not-an-email",
            "password": "longenough",
            "password_confirm": "different1",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    let details = body["error"]["details"].as_array().expect("details");
    assert!(details.len() >= 2);
}

#[actix_rt::test]
async fn empty_city_search_is_rejected() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::get().uri("/api/cities/search?query=%20").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn health_reports_an_unreachable_database() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "unavailable");
}

#[actix_rt::test]
async fn cors_preflight_short_circuits() {
    let services = Services::offline();
    let app = test_app!(services);

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/companies")
        .insert_header((header::ORIGIN, ORIGIN))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ORIGIN
    );
}

#[actix_rt::test]
async fn rate_limit_applies_across_requests() {
    let limiter = create_rate_limiter(2, Duration::from_secs(60));
    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(limiter))
            .route("/status", web::get().to(handlers::server_status)),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::get().uri("/status").to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
    let req = test::TestRequest::get().uri("/status").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[actix_rt::test]
async fn lookup_routes_reach_their_handlers() {
    let services = Services::offline();
    let app = test_app!(services);

    for path in ["rating-categories", "benefit-types", "employment-types", "employment-periods"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/{}", path))
            .insert_header(bearer(&services.auth, 14, UserRole::Admin))
            .set_json(serde_json::json!({ "name": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", path);

        let body: Value = test::read_body_json(resp).await;
        let details = body["error"]["details"].as_array().expect("details");
        assert!(details.iter().any(|d| d.as_str().unwrap_or("").contains("Name")), "{}", path);
    }
}
