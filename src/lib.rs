pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod user;
pub mod validation;

use std::sync::Arc;
use std::time::Duration as StdDuration;
use actix_web::{web, HttpResponse};
use chrono::Duration;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthService, Authenticator, PasswordHasher, RateLimiter, RateLimitConfig, TokenService};
pub use db::{CounterStore, DbOperations, MemoryStore, PublicUser, User, UserStore};

use crate::config::CounterBackend;
use error::DatabaseError;
use response::ApiResponse;

const DB_ACQUIRE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Health check endpoint handler
/// Returns the envelope with the server timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(
        "Auth service is running",
        serde_json::json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
    ))
}

/// Fallback for unknown routes.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(response::ErrorBody::new("Not found", None))
}

/// Turns body deserialization failures into 422 envelopes.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::validation(err.to_string()).into())
}

/// Route table shared by the server binary and the integration tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(health_check))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::handlers::register))
                .route("/login", web::post().to(auth::handlers::login)),
        )
        .service(
            web::scope("/user")
                .route("/profile", web::get().to(user::get_profile))
                .route("/profile", web::patch().to(user::update_profile)),
        );
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub users: Arc<dyn UserStore>,
    pub auth_service: Arc<AuthService>,
    pub authenticator: Arc<Authenticator>,
    pub rate_limiter: Arc<RateLimiter>,
    pools: Vec<DbOperations>,
}

impl AppState {
    /// Validates the settings, connects to Postgres and wires the services.
    pub async fn new(config: Settings) -> Result<Self> {
        config.validate()?;

        let db = connect(&config.database.url, config.database.max_connections).await?;
        if config.database.run_migrations {
            db.run_migrations().await?;
            info!("Database migrations applied");
        }

        let mut pools = vec![db.clone()];
        let counters: Arc<dyn CounterStore> = match config.rate_limit.store {
            CounterBackend::Memory => Arc::new(MemoryStore::new()),
            CounterBackend::Postgres if config.rate_limit.database_url.is_some() => {
                let counter_db = connect(config.counter_store_url(), config.database.max_connections).await?;
                if config.database.run_migrations {
                    counter_db.run_migrations().await?;
                }
                pools.push(counter_db.clone());
                Arc::new(counter_db)
            }
            CounterBackend::Postgres => Arc::new(db.clone()),
        };

        let mut state = Self::from_parts(config, Arc::new(db), counters)?;
        state.pools = pools;
        Ok(state)
    }

    /// Wires the services over caller-supplied stores.
    pub fn from_parts(
        config: Settings,
        users: Arc<dyn UserStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Result<Self> {
        config.validate()?;

        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            Duration::minutes(config.auth.access_token_ttl_minutes),
            Duration::days(config.auth.refresh_token_ttl_days),
        )?);

        let auth_service = AuthService::new(
            users.clone(),
            PasswordHasher::new(config.auth.bcrypt_cost),
            tokens.clone(),
        );
        let rate_limiter = RateLimiter::new(counters, RateLimitConfig::from(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            users,
            auth_service: Arc::new(auth_service),
            authenticator: Arc::new(Authenticator::new(tokens)),
            rate_limiter: Arc::new(rate_limiter),
            pools: Vec::new(),
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        for pool in &self.pools {
            pool.close().await;
        }
        Ok(())
    }
}

async fn connect(url: &str, max_connections: u32) -> Result<DbOperations> {
    DbOperations::new_with_options(url, max_connections, DB_ACQUIRE_TIMEOUT)
        .await
        .map_err(|e| match e {
            AppError::DatabaseError(DatabaseError::QueryError(msg)) => {
                AppError::DatabaseError(DatabaseError::ConnectionError(msg))
            }
            other => other,
        })
}
