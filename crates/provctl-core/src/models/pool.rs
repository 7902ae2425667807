//! Pool domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProvError, ProvResult};
use crate::models::resource::{Resource, ResourceKind};

/// A named group of nodes that applications are scheduled onto.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Pool {
    pub name: String,
    pub provisioner: String,
    /// Receives applications that do not ask for a specific pool.
    pub default: bool,
    /// Usable by every team.
    pub public: bool,
    pub labels: BTreeMap<String, String>,
}

impl Resource for Pool {
    const KIND: ResourceKind = ResourceKind::Pool;

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> ProvResult<()> {
        if self.name.is_empty() {
            return Err(ProvError::validation("pool name is mandatory"));
        }
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.default
    }
}
