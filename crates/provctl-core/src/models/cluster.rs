//! Provisioner cluster domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProvError, ProvResult};
use crate::models::resource::{Resource, ResourceKind};

/// A cluster a provisioner deploys workloads to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub name: String,
    /// API endpoints of the cluster.
    pub addresses: Vec<String>,
    /// Name of the provisioner that manages this cluster.
    pub provisioner: String,
    pub ca_cert: String,
    pub client_cert: String,
    pub client_key: String,
    /// Pools served by this cluster. Mutually exclusive with `default`.
    pub pools: Vec<String>,
    /// Provisioner-specific settings applied on every reconcile.
    pub custom_data: BTreeMap<String, String>,
    /// Provisioner-specific settings consumed only when the cluster is
    /// first created.
    pub create_data: BTreeMap<String, String>,
    /// Serves every pool not claimed by another cluster.
    pub default: bool,
}

impl Resource for Cluster {
    const KIND: ResourceKind = ResourceKind::Cluster;

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> ProvResult<()> {
        if self.name.is_empty() {
            return Err(ProvError::validation("cluster name is mandatory"));
        }
        if self.default && !self.pools.is_empty() {
            return Err(ProvError::validation(
                "cannot have both pools and default set",
            ));
        }
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.default
    }
}
