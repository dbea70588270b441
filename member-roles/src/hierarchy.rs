// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ancestor chains of resources and the per-root gate deciding whether custom roles are
//! considered at all.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::gate::FeatureGate;
use crate::traits::RoleStore;
use crate::types::{NamespaceId, Resource};

/// Namespace ids from the root down to the namespace closest to a resource.
///
/// For groups the chain ends with the group itself, for projects with the namespace the project
/// lives in. A chain is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorChain(Vec<NamespaceId>);

impl AncestorChain {
    /// Returns `None` for an empty list of ids.
    pub fn new(traversal_ids: Vec<NamespaceId>) -> Option<Self> {
        if traversal_ids.is_empty() {
            None
        } else {
            Some(Self(traversal_ids))
        }
    }

    pub fn root(&self) -> NamespaceId {
        self.0[0]
    }

    pub fn contains(&self, namespace: &NamespaceId) -> bool {
        self.0.contains(namespace)
    }

    pub fn ids(&self) -> &[NamespaceId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ancestor chains of the given resources, limited to hierarchies where custom roles are in
/// use.
///
/// Every distinct root is checked once: the custom roles license needs to be active for it
/// and, on SaaS, the root has to define at least one member role. Resources failing the gate
/// or unknown to the store are left out of the result.
pub async fn ancestor_chains_for<S, G, R>(
    store: &S,
    gates: &G,
    config: &Config,
    resources: &[R],
) -> Result<BTreeMap<R, AncestorChain>, S::Error>
where
    S: RoleStore,
    G: FeatureGate,
    R: Resource,
{
    if resources.is_empty() {
        return Ok(BTreeMap::new());
    }

    let chains = store.ancestor_chains(resources).await?;

    let mut enabled_roots: BTreeSet<NamespaceId> = chains
        .values()
        .map(AncestorChain::root)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|root| gates.custom_roles_licensed(Some(*root)))
        .collect();

    if config.requires_root_member_roles() && !enabled_roots.is_empty() {
        let with_roles = store.namespaces_with_member_roles(&enabled_roots).await?;
        enabled_roots.retain(|root| with_roles.contains(root));
    }

    let filtered: BTreeMap<R, AncestorChain> = chains
        .into_iter()
        .filter(|(_, chain)| enabled_roots.contains(&chain.root()))
        .collect();

    debug!(
        kind = R::KIND.as_str(),
        requested = resources.len(),
        enabled = filtered.len(),
        "resolved ancestor chains"
    );

    Ok(filtered)
}
