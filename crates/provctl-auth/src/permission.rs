//! Permission checking against the grants carried by a token.

use provctl_core::authz::Authorizer;
use provctl_core::models::token::Token;

/// Authorizes a caller by the permissions embedded in its token.
///
/// A grant covers its own scheme and every scheme below it, so
/// `cluster` authorizes `cluster.update` and `cluster.read.events`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionChecker;

impl Authorizer for PermissionChecker {
    fn check(&self, token: &Token, scheme: &str) -> bool {
        token.permissions.iter().any(|perm| perm.covers(scheme))
    }
}
