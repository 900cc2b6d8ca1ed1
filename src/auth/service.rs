use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::password::PasswordHasher;
use crate::auth::token::{TokenPair, TokenService};
use crate::db::models::{PublicUser, User};
use crate::db::UserStore;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub token: TokenPair,
}

/// Register and login on top of a [`UserStore`], a [`PasswordHasher`] and a
/// [`TokenService`].
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    // Verified against when the email is unknown, so that path costs the
    // same bcrypt work as a wrong password.
    dummy_digest: String,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: Arc<TokenService>) -> Self {
        let dummy_digest = hasher.hash("authkeeper-dummy-password").unwrap_or_default();
        Self { users, hasher, tokens, dummy_digest }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<PublicUser> {
        // Early exit only; the store's unique constraint is what actually
        // settles two concurrent registrations.
        if self.users.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists.into());
        }

        let hasher = self.hasher;
        let plaintext = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await??;

        let user = User::new(name.to_string(), email.to_string(), password_hash);
        let created = match self.users.create_user(&user).await {
            Ok(created) => created,
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                return Err(AuthError::AlreadyExists.into());
            }
            Err(e) => return Err(e),
        };

        info!("Created user {}", created.id);
        Ok(created.into())
    }

    /// Unknown email, wrong password and deactivated account all produce the
    /// same `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let user = self.users.get_user_by_email(email).await?;

        let hasher = self.hasher;
        let plaintext = password.to_string();
        let digest = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_digest.clone(),
        };
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await?;

        let Some(user) = user else {
            warn!("Login rejected: no account for the given email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !matches {
            warn!("Login rejected for user {}: password mismatch", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.active {
            warn!("Login rejected for user {}: account inactive", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.tokens.issue(&user.id.to_string())?;

        let now = Utc::now();
        self.users.touch_last_login(user.id, now).await?;

        let mut user: PublicUser = user.into();
        user.last_login_at = Some(now);

        Ok(LoginOutcome { user, token })
    }
}
