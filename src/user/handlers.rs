use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::db::PublicUser;
use crate::error::{AppError, DatabaseError};
use crate::response::ApiResponse;
use crate::validation::{validate_name, Violations};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut violations = Violations::new();
        violations.check("name", validate_name(&self.name));
        violations.into_result()
    }
}

pub async fn get_profile(
    AuthenticatedUser(user_id): AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    // A verified token can outlive its user.
    let user = state.users.get_user_by_id(user_id).await?.ok_or_else(|| {
        warn!("Token subject {} has no matching user", user_id);
        AppError::DatabaseError(DatabaseError::NotFound)
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "User details retrieved successfully",
        PublicUser::from(user),
    )))
}

pub async fn update_profile(
    AuthenticatedUser(user_id): AuthenticatedUser,
    req: web::Json<UpdateProfileRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let user = state
        .users
        .update_user_name(user_id, &req.name)
        .await?
        .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;

    info!("Updated profile for user {}", user_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "User details updated successfully",
        PublicUser::from(user),
    )))
}
