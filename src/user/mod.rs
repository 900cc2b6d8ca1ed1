//! Profile read/update for the authenticated caller.

pub mod handlers;

pub use handlers::{get_profile, update_profile, UpdateProfileRequest};
