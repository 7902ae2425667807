//! Audit event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resource::ResourceKind;
use crate::models::token::Token;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActorType {
    User,
    ServiceAccount,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "User",
            ActorType::ServiceAccount => "ServiceAccount",
            ActorType::System => "System",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "User" => Some(ActorType::User),
            "ServiceAccount" => Some(ActorType::ServiceAccount),
            "System" => Some(ActorType::System),
            _ => None,
        }
    }
}

/// The resource an audited operation acted upon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub kind: ResourceKind,
    pub value: String,
}

/// Who performed an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Owner {
    pub actor_type: ActorType,
    pub name: String,
}

impl From<&Token> for Owner {
    fn from(token: &Token) -> Self {
        Self {
            actor_type: token.actor_type,
            name: token.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Running,
    Success,
    Failure,
}

/// One audited, state-changing operation.
///
/// Opened before the side effect and finished exactly once afterwards;
/// `error` is the message surfaced to the caller, or `None` on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub target: Target,
    /// Scheme of the capability that authorized the operation.
    pub kind: String,
    pub owner: Owner,
    /// Snapshot of the raw input, keyed as the caller sent it.
    pub custom_data: serde_json::Value,
    /// Scheme a reader must hold to see this event.
    pub allowed: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub running: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn outcome(&self) -> AuditOutcome {
        match (self.running, &self.error) {
            (true, _) => AuditOutcome::Running,
            (false, None) => AuditOutcome::Success,
            (false, Some(_)) => AuditOutcome::Failure,
        }
    }
}

/// Fields required to open a new audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEvent {
    pub target: Target,
    pub kind: String,
    pub owner: Owner,
    pub custom_data: serde_json::Value,
    pub allowed: String,
}
