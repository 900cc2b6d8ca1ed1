//! Password hashing via bcrypt.

use tracing::debug;

use crate::error::AppError;

/// Salted bcrypt hashing with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: bcrypt::DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Each call draws a fresh salt, so hashing the same input twice yields
    /// different digests.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AppError::InternalError(format!("bcrypt hash: {e}")))
    }

    /// Constant-time check. A digest that does not parse verifies as `false`.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("Rejecting unparseable password digest: {}", e);
                false
            }
        }
    }
}
