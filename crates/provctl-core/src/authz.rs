//! Authorization seam.

use crate::models::token::Token;

/// Decides whether a caller holds a permission scheme.
///
/// Implementations must be pure: no I/O, no side effects. The gateway
/// consults it before any other step of an operation.
pub trait Authorizer: Send + Sync {
    fn check(&self, token: &Token, scheme: &str) -> bool;
}

impl<A: Authorizer + ?Sized> Authorizer for std::sync::Arc<A> {
    fn check(&self, token: &Token, scheme: &str) -> bool {
        (**self).check(token, scheme)
    }
}
