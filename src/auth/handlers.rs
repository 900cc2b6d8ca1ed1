use actix_web::{web, HttpRequest, HttpResponse};
use actix_web::Error as ActixError;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::validation::{validate_email, validate_name, validate_password, Violations};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut violations = Violations::new();
        violations
            .check("email", validate_email(&self.email))
            .check("password", validate_password(&self.password));
        violations.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut violations = Violations::new();
        violations
            .check("email", validate_email(&self.email))
            .check("password", validate_password(&self.password))
            .check("name", validate_name(&self.name));
        violations.into_result()
    }
}

/// The body is taken as a `Result` so that the rate limiter counts the
/// request before a malformed body is turned into a 422.
pub async fn login(
    http_req: HttpRequest,
    req: Result<web::Json<LoginRequest>, ActixError>,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    state.rate_limiter.check(&http_req).await?;
    let req = req?;
    req.validate()?;

    info!("Received login request for email: {}", req.email);
    match state.auth_service.login(&req.email, &req.password).await {
        Ok(outcome) => {
            info!("Login successful for user {}", outcome.user.id);
            Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", outcome)))
        }
        Err(e) => {
            warn!("Login failed for email: {}: {}", req.email, e);
            Err(e.into())
        }
    }
}

pub async fn register(
    http_req: HttpRequest,
    req: Result<web::Json<RegisterRequest>, ActixError>,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    state.rate_limiter.check(&http_req).await?;
    let req = req?;
    req.validate()?;

    info!("Received registration request for email: {}", req.email);
    match state.auth_service.register(&req.name, &req.email, &req.password).await {
        Ok(user) => {
            info!("Registration successful for email: {}", req.email);
            Ok(HttpResponse::Created().json(ApiResponse::success("User created successfully", user)))
        }
        Err(e) => {
            warn!("Registration failed for email: {}: {}", req.email, e);
            Err(e.into())
        }
    }
}
