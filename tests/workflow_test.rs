//! End-to-end service flows against PostgreSQL. Skipped unless `DATABASE_URL` is set.

mod common;

use std::collections::HashMap;

use common::{unique, Services};
use jobsolution_api::models::{
    AdminReviewUpdate, CityRequest, CompanyRequest, CompanySize, ForgotPasswordRequest, IndustryRequest,
    LoginRequest, LookupKind, LookupRequest, ModerationRequest, RegisterRequest,
    ResetPasswordRequest, ReviewRequest, ReviewStatus, UserRole,
};
use jobsolution_api::utils::Page;

// Admin counts are global, so the flows run one at a time.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

struct Fixture {
    company_id: i32,
    city_id: i32,
    employment_type_id: i32,
    employment_period_id: i32,
    categories: [i32; 2],
}

async fn fixture(s: &Services) -> Fixture {
    let city = s
        .reference
        .create_city(CityRequest {
            name: unique("City"),
            region: None,
            country: "Россия".to_string(),
        })
        .await
        .expect("city");
    let industry = s
        .reference
        .create_industry(IndustryRequest {
            name: unique("Industry"),
            color: None,
        })
        .await
        .expect("industry");

    let lookup = |kind: LookupKind| async move {
        s.reference
            .create_lookup(
                kind,
                LookupRequest {
                    name: unique(kind.label()),
                    description: None,
                },
            )
            .await
            .expect("lookup")
            .id
    };
    let employment_type_id = lookup(LookupKind::EmploymentType).await;
    let employment_period_id = lookup(LookupKind::EmploymentPeriod).await;
    let categories = [
        lookup(LookupKind::RatingCategory).await,
        lookup(LookupKind::RatingCategory).await,
    ];

    let company = s
        .companies
        .create(CompanyRequest {
            name: unique("Company"),
            size: CompanySize::Medium,
            logo: None,
            website: Some("https://company.example".to_string()),
            email: None,
            phone: None,
            address: None,
            city_id: Some(city.id),
            industries: vec![industry.id],
        })
        .await
        .expect("company");

    Fixture {
        company_id: company.company.id,
        city_id: city.id,
        employment_type_id,
        employment_period_id,
        categories,
    }
}

async fn register(s: &Services, prefix: &str) -> (i32, String) {
    let email = format!("{}@example.com", unique(prefix));
    let auth = s
        .users
        .register(RegisterRequest {
            email: email.clone(),
            phone: None,
            password: "Secret123".to_string(),
            password_confirm: "Secret123".to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
        })
        .await
        .expect("register");
    (auth.user.id, email)
}

fn review(f: &Fixture, scores: [f64; 2], recommended: bool) -> ReviewRequest {
    ReviewRequest {
        company_id: f.company_id,
        position: "Backend developer".to_string(),
        employment_type_id: f.employment_type_id,
        employment_period_id: f.employment_period_id,
        city_id: f.city_id,
        category_ratings: HashMap::from([(f.categories[0], scores[0]), (f.categories[1], scores[1])]),
        pros: "Friendly team and modern stack".to_string(),
        cons: "Too many meetings every week".to_string(),
        benefit_type_ids: Vec::new(),
        is_former_employee: false,
        is_recommended: recommended,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let (_, email) = register(&s, "dup").await;
    let err = s
        .users
        .register(RegisterRequest {
            email: email.to_uppercase(),
            phone: None,
            password: "Secret123".to_string(),
            password_confirm: "Secret123".to_string(),
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 409);

    let err = s
        .users
        .login(LoginRequest {
            email,
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 401);
}

#[tokio::test]
async fn refresh_token_cannot_be_replayed() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let (_, email) = register(&s, "refresh").await;
    let login = s
        .users
        .login(LoginRequest {
            email,
            password: "Secret123".to_string(),
        })
        .await
        .expect("login");

    let first = login.tokens.refresh_token;
    let rotated = s.users.refresh(&first).await.expect("first refresh");
    assert_ne!(rotated.tokens.refresh_token, first);

    let err = s.users.refresh(&first).await.unwrap_err();
    assert_eq!(err.status_code, 401);

    s.users.logout(&rotated.tokens.refresh_token).await.expect("logout");
    assert!(s.users.refresh(&rotated.tokens.refresh_token).await.is_err());
}

#[tokio::test]
async fn password_reset_revokes_sessions() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let (_, email) = register(&s, "reset").await;
    let login = s
        .users
        .login(LoginRequest {
            email: email.clone(),
            password: "Secret123".to_string(),
        })
        .await
        .expect("login");

    let issued = s
        .users
        .forgot_password(ForgotPasswordRequest { email: email.clone() })
        .await
        .expect("forgot");
    let token = issued.reset_token.expect("token exposed in debug mode");

    s.users
        .reset_password(ResetPasswordRequest {
            token: token.clone(),
            password: "NewSecret456".to_string(),
            password_confirm: "NewSecret456".to_string(),
        })
        .await
        .expect("reset");

    assert!(s.users.refresh(&login.tokens.refresh_token).await.is_err());

    let err = s
        .users
        .reset_password(ResetPasswordRequest {
            token,
            password: "Another789".to_string(),
            password_confirm: "Another789".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 400);

    s.users
        .login(LoginRequest {
            email,
            password: "NewSecret456".to_string(),
        })
        .await
        .expect("login with new password");

    // unknown addresses get the same answer
    let unknown = s
        .users
        .forgot_password(ForgotPasswordRequest {
            email: format!("{}@example.com", unique("nobody")),
        })
        .await
        .expect("forgot unknown");
    assert_eq!(unknown.message, issued.message);
    assert!(unknown.reset_token.is_none());
}

#[tokio::test]
async fn moderation_keeps_company_aggregates_in_sync() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let f = fixture(&s).await;
    let (author, _) = register(&s, "author").await;

    let good = s.reviews.create(author, review(&f, [4.0, 5.0], true)).await.expect("good");
    let bad = s.reviews.create(author, review(&f, [2.0, 3.0], false)).await.expect("bad");
    let spam = s.reviews.create(author, review(&f, [1.0, 1.0], false)).await.expect("spam");
    assert_eq!(good.review.status, ReviewStatus::Pending);
    assert!(close(good.review.rating, 4.5));

    // pending reviews are invisible and do not count
    assert_eq!(s.reviews.get_public(good.review.id, None).await.unwrap_err().status_code, 404);
    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 0);

    s.reviews.approve(good.review.id, ModerationRequest::default()).await.expect("approve");
    s.reviews.approve(bad.review.id, ModerationRequest::default()).await.expect("approve");

    let err = s
        .reviews
        .approve(good.review.id, ModerationRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 400);

    let err = s.reviews.reject(spam.review.id, ModerationRequest::default()).await.unwrap_err();
    assert_eq!(err.status_code, 400);
    let rejected = s
        .reviews
        .reject(
            spam.review.id,
            ModerationRequest {
                status: Some(ReviewStatus::Rejected),
                moderation_comment: Some("Not about the employer".to_string()),
            },
        )
        .await
        .expect("reject");
    assert_eq!(rejected.status, ReviewStatus::Rejected);

    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 2);
    assert!(close(company.company.average_rating, 3.5));
    assert!(close(company.company.recommendation_percentage, 50.0));
    let first_category = company
        .category_ratings
        .iter()
        .find(|r| r.category_id == f.categories[0])
        .expect("category rating");
    assert!(close(first_category.rating, 3.0));

    // the slug resolves to the same company
    let by_slug = s.companies.get(&company.company.slug).await.expect("by slug");
    assert_eq!(by_slug.company.id, f.company_id);

    s.reviews.admin_delete(good.review.id).await.expect("delete");
    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 1);
    assert!(close(company.company.average_rating, 2.5));
    assert!(close(company.company.recommendation_percentage, 0.0));

    // the city is still used by the company and the reviews
    let err = s.reference.delete_city(f.city_id).await.unwrap_err();
    assert_eq!(err.status_code, 409);
}

#[tokio::test]
async fn admin_edits_and_user_deletion_recompute_aggregates() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let f = fixture(&s).await;
    let other = fixture(&s).await;
    let (author, _) = register(&s, "leaver").await;
    let (colleague, _) = register(&s, "colleague").await;

    let kept = s.reviews.create(author, review(&f, [4.0, 5.0], true)).await.expect("kept");
    let dropped = s.reviews.create(author, review(&f, [2.0, 2.0], false)).await.expect("dropped");
    let marked = s
        .reviews
        .create(colleague, review(&other, [3.0, 3.0], true))
        .await
        .expect("marked");
    for id in [kept.review.id, dropped.review.id, marked.review.id] {
        s.reviews.approve(id, ModerationRequest::default()).await.expect("approve");
    }
    s.reviews.mark_useful(author, marked.review.id).await.expect("mark");

    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 2);
    assert!(close(company.company.average_rating, 3.25));

    s.reviews
        .admin_update(
            dropped.review.id,
            AdminReviewUpdate {
                status: Some(ReviewStatus::Rejected),
                moderation_comment: Some("Duplicate".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("reject via update");
    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 1);
    assert!(close(company.company.average_rating, 4.5));
    assert!(close(company.company.recommendation_percentage, 100.0));

    s.reviews
        .admin_update(
            kept.review.id,
            AdminReviewUpdate {
                rating: Some(2.0),
                ..Default::default()
            },
        )
        .await
        .expect("change rating");
    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 1);
    assert!(close(company.company.average_rating, 2.0));

    s.admin.delete_user(colleague, author).await.expect("delete author");
    let company = s.companies.get(&f.company_id.to_string()).await.expect("company");
    assert_eq!(company.company.reviews_count, 0);
    assert!(close(company.company.average_rating, 0.0));
    assert!(close(company.company.recommendation_percentage, 0.0));

    let seen = s.reviews.get_public(marked.review.id, None).await.expect("marked review");
    assert_eq!(seen.review.useful_count, 0);
}

#[tokio::test]
async fn useful_marks_are_idempotent() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let f = fixture(&s).await;
    let (author, _) = register(&s, "writer").await;
    let (reader, _) = register(&s, "reader").await;

    let pending = s.reviews.create(author, review(&f, [3.0, 4.0], true)).await.expect("review");
    let err = s.reviews.mark_useful(reader, pending.review.id).await.unwrap_err();
    assert_eq!(err.status_code, 404);

    s.reviews.approve(pending.review.id, ModerationRequest::default()).await.expect("approve");
    let id = pending.review.id;

    let first = s.reviews.mark_useful(reader, id).await.expect("mark");
    let again = s.reviews.mark_useful(reader, id).await.expect("mark again");
    assert_eq!(first.useful_count, 1);
    assert_eq!(again.useful_count, 1);
    assert!(again.is_marked_as_useful);

    let seen = s.reviews.get_public(id, Some(reader)).await.expect("get");
    assert!(seen.is_marked_as_useful);

    let removed = s.reviews.unmark_useful(reader, id).await.expect("unmark");
    assert_eq!(removed.useful_count, 0);
    assert!(!removed.is_marked_as_useful);

    let err = s.reviews.unmark_useful(reader, id).await.unwrap_err();
    assert_eq!(err.status_code, 400);
}

#[tokio::test]
async fn last_admin_is_protected() {
    let Some(s) = common::database().await else { return };
    let _guard = DB_LOCK.lock().await;

    let (keeper, _) = register(&s, "keeper").await;
    let (operator, _) = register(&s, "operator").await;
    s.admin.update_role(operator, keeper, UserRole::Admin).await.expect("promote");

    // leave `keeper` as the only administrator
    let mut page = 1;
    loop {
        let (users, _) = s.db.list_users(Page::new(Some(page), Some(100))).await.expect("users");
        if users.is_empty() {
            break;
        }
        for user in users.iter().filter(|u| u.role == UserRole::Admin && u.id != keeper) {
            s.admin.update_role(keeper, user.id, UserRole::User).await.expect("demote");
        }
        page += 1;
    }

    let err = s.admin.update_role(operator, keeper, UserRole::User).await.unwrap_err();
    assert_eq!(err.status_code, 400);
    let err = s.admin.delete_user(operator, keeper).await.unwrap_err();
    assert_eq!(err.status_code, 400);
    let err = s.admin.delete_user(keeper, keeper).await.unwrap_err();
    assert_eq!(err.status_code, 400);

    // with a second admin the first one may go
    s.admin.update_role(keeper, operator, UserRole::Admin).await.expect("promote");
    s.admin.delete_user(operator, keeper).await.expect("delete");
    assert_eq!(s.admin.get_user(keeper).await.unwrap_err().status_code, 404);

    let stats = s.admin.statistics().await.expect("statistics");
    assert!(stats.users_count >= 1);
}
