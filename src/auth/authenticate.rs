use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::auth::token::{TokenError, TokenService, TokenType};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Why a request failed to authenticate. Only the header problems keep their
/// own client message; every token failure surfaces as `Unauthenticated`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header is not `Bearer <token>`")]
    MalformedHeader,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0} token presented where an access token is required")]
    WrongTokenType(TokenType),
}

impl From<AuthenticationError> for AppError {
    fn from(err: AuthenticationError) -> Self {
        let public = match err {
            AuthenticationError::MissingHeader => AuthError::MissingHeader,
            AuthenticationError::MalformedHeader => AuthError::MalformedHeader,
            AuthenticationError::Token(_) | AuthenticationError::WrongTokenType(_) => {
                AuthError::Unauthenticated
            }
        };
        AppError::AuthError(public)
    }
}

pub struct Authenticator {
    tokens: Arc<TokenService>,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Returns the subject of a valid access token carried as
    /// `Authorization: Bearer <token>`. The user record is not looked up.
    pub fn authenticate(&self, header_value: Option<&str>) -> Result<String, AuthenticationError> {
        let header_value = header_value.ok_or(AuthenticationError::MissingHeader)?;

        let parts: Vec<&str> = header_value.split_whitespace().collect();
        let token = match parts.as_slice() {
            [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => *token,
            _ => return Err(AuthenticationError::MalformedHeader),
        };

        let claims = self.tokens.verify(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthenticationError::WrongTokenType(claims.token_type));
        }

        Ok(claims.sub)
    }
}

/// Extractor for handlers that require a logged-in caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

impl AuthenticatedUser {
    fn from_request_sync(req: &HttpRequest) -> Result<Self, AppError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::InternalError("application state is not registered".into()))?;

        let header_value = match req.headers().get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                warn!("Rejected request with non-ASCII authorization header");
                AppError::AuthError(AuthError::MalformedHeader)
            })?),
            None => None,
        };

        let subject = state.authenticator.authenticate(header_value).map_err(|e| {
            warn!("Authentication failed for {}: {}", req.path(), e);
            AppError::from(e)
        })?;

        let user_id = Uuid::parse_str(&subject).map_err(|_| {
            warn!("Authentication failed for {}: subject {:?} is not a user id", req.path(), subject);
            AppError::AuthError(AuthError::Unauthenticated)
        })?;

        Ok(AuthenticatedUser(user_id))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_request_sync(req))
    }
}
