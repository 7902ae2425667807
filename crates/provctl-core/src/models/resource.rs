//! Resource kinds and the descriptor trait shared by every managed kind.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProvResult;

/// Kind of resource a descriptor, capability, or audit target refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cluster,
    Pool,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Cluster, ResourceKind::Pool];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::Pool => "pool",
        }
    }

    /// Parse a kind name, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strongly-typed descriptor of one managed resource.
///
/// Descriptors are keyed by `name`; saving one is a full upsert. The
/// serde representation doubles as the wire format: field names are
/// what the input binder matches (case-insensitively) and what list
/// responses serialize.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn name(&self) -> &str;

    /// Shape checks that hold regardless of store state.
    fn validate(&self) -> ProvResult<()>;

    /// Whether this descriptor claims the kind-wide default flag.
    ///
    /// Descriptors that support the flag serialize it as `default`.
    fn is_default(&self) -> bool {
        false
    }
}
