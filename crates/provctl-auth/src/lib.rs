//! provctl auth: bearer JWT validation and token-embedded permission
//! checks.

pub mod config;
pub mod error;
pub mod permission;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use permission::PermissionChecker;
pub use token::{AccessTokenClaims, authenticate, issue_access_token};
