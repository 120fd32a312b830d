use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use jobsolution_api::auth::AuthService;
use jobsolution_api::config::{self, AppConfig};
use jobsolution_api::database::DatabaseService;
use jobsolution_api::handlers;
use jobsolution_api::middleware::*;
use jobsolution_api::services::{
    AdminService, CompanyService, ReferenceService, ReviewService, SuggestionService, UserService,
};
use jobsolution_api::utils;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment from .env (if present)
    let env_problem = config::load_dotenv();

    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // File + stdout logging; the handle must outlive the server
    let _logger = utils::logging::init(&config.logging.level, &config.logging.directory);
    if let Some(e) = env_problem {
        log::warn!("Ignoring malformed .env file: {}", e);
    }

    log::info!("Starting JobSolution API v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Server: {}:{} ({} mode)", config.server.host, config.server.port, config.server.mode);
    log::info!("Workers: {}", config.server.workers);

    let db_service = Arc::new(
        DatabaseService::new(&config.database)
            .await
            .map_err(|e| startup_error("Failed to initialize database", e))?,
    );

    let applied = db_service
        .run_migrations(&config.database.migrations_dir)
        .await
        .map_err(|e| startup_error("Failed to apply migrations", e))?;
    log::info!("Schema up to date ({} migration(s) applied now)", applied.len());

    let auth_service = Arc::new(AuthService::new(config.auth.clone()));

    let user_service = Arc::new(UserService::new(
        Arc::clone(&db_service),
        Arc::clone(&auth_service),
        config.server.is_debug(),
    ));
    let company_service = Arc::new(CompanyService::new(Arc::clone(&db_service)));
    let review_service = Arc::new(ReviewService::new(Arc::clone(&db_service)));
    let reference_service = Arc::new(ReferenceService::new(Arc::clone(&db_service)));
    let admin_service = Arc::new(AdminService::new(Arc::clone(&db_service)));
    let suggestion_service = Arc::new(SuggestionService::new(Arc::clone(&db_service)));

    let rate_limiter = create_rate_limiter(
        config.security.rate_limit_requests,
        Duration::from_secs(config.security.rate_limit_window_seconds),
    );

    match db_service.purge_expired_tokens().await {
        Ok(0) => {}
        Ok(n) => log::info!("Purged {} expired token(s)", n),
        Err(e) => log::warn!("Failed to purge expired tokens: {}", e),
    }

    log::info!(
        "Health check: http://{}:{}/health",
        config.server.host,
        config.server.port
    );

    let bind_addr = (config.server.host.clone(), config.server.port);
    let workers = config.server.workers;
    let server = config.server.clone();
    let security = config.security.clone();

    HttpServer::new(move || {
        let auth_for_routes = Arc::clone(&auth_service);
        App::new()
            .app_data(web::Data::new(Arc::clone(&db_service)))
            .app_data(web::Data::new(Arc::clone(&auth_service)))
            .app_data(web::Data::new(Arc::clone(&user_service)))
            .app_data(web::Data::new(Arc::clone(&company_service)))
            .app_data(web::Data::new(Arc::clone(&review_service)))
            .app_data(web::Data::new(Arc::clone(&reference_service)))
            .app_data(web::Data::new(Arc::clone(&admin_service)))
            .app_data(web::Data::new(Arc::clone(&suggestion_service)))
            // Custom middleware first, the built-in Compress changes the body type
            .wrap(SecurityHeadersMiddleware)
            .wrap(LoggingMiddleware)
            .wrap(RequestSizeLimitMiddleware {
                max_size: security.max_request_size_bytes,
            })
            .wrap(RateLimitMiddleware::new(Arc::clone(&rate_limiter)))
            .wrap(CorsMiddleware::new(security.cors_allowed_origins.clone()))
            .wrap(actix_middleware::Compress::default())
            .configure(move |cfg| handlers::configure(cfg, auth_for_routes))
    })
    .bind(bind_addr)?
    .workers(workers)
    .keep_alive(Duration::from_secs(server.keep_alive_seconds))
    .client_request_timeout(Duration::from_secs(server.client_timeout_seconds))
    .client_disconnect_timeout(Duration::from_secs(server.client_shutdown_seconds))
    .run()
    .await
}
