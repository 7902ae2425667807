//! Permission and capability domain model.
//!
//! Permissions are dotted scheme names arranged as a tree:
//!
//! ```text
//! *
//! └── cluster
//!     ├── cluster.read
//!     │   └── cluster.read.events
//!     ├── cluster.update
//!     └── cluster.delete
//! ```
//!
//! Holding a scheme grants every scheme below it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::resource::ResourceKind;

/// Operation a capability authorizes on a resource kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Update,
    Delete,
    /// Read audit events targeting the kind.
    ReadEvents,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::ReadEvents => "read.events",
        }
    }
}

/// A named permission scoped to a resource kind and an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Capability {
    pub kind: ResourceKind,
    pub action: Action,
}

impl Capability {
    pub const fn new(kind: ResourceKind, action: Action) -> Self {
        Self { kind, action }
    }

    /// Scheme name, e.g. `cluster.update`.
    pub fn scheme(&self) -> String {
        format!("{}.{}", self.kind.as_str(), self.action.as_str())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.as_str(), self.action.as_str())
    }
}

/// A granted permission: a scheme and, implicitly, everything below it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub const ALL: &'static str = "*";

    pub fn new(scheme: impl Into<String>) -> Self {
        Self(scheme.into())
    }

    pub fn all() -> Self {
        Self(Self::ALL.into())
    }

    pub fn scheme(&self) -> &str {
        &self.0
    }

    /// Whether this grant covers `scheme`.
    pub fn covers(&self, scheme: &str) -> bool {
        if self.0 == Self::ALL || self.0 == scheme {
            return true;
        }
        scheme
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}
