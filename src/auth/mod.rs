//! Authentication: password hashing, token issuance and verification,
//! request authentication and rate limiting of the credential endpoints.

pub mod authenticate;
pub mod handlers;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod token;

pub use authenticate::{AuthenticatedUser, AuthenticationError, Authenticator};
pub use password::PasswordHasher;
pub use rate_limit::{client_identity, RateLimitConfig, RateLimitDecision, RateLimiter};
pub use service::{AuthService, LoginOutcome};
pub use token::{Claims, TokenError, TokenPair, TokenService, TokenType};
