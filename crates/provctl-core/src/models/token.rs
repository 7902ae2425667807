//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use crate::models::audit::ActorType;
use crate::models::permission::Permission;

/// The caller of an operation, as established by authentication.
///
/// Read-only to the gateway: it is handed in by the boundary and only
/// inspected for authorization and audit ownership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub subject: String,
    pub actor_type: ActorType,
    pub permissions: Vec<Permission>,
}

impl Token {
    pub fn new(
        subject: impl Into<String>,
        actor_type: ActorType,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            subject: subject.into(),
            actor_type,
            permissions,
        }
    }
}
