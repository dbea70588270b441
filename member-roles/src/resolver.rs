// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution façade answering "which custom permissions does this user hold on these
//! resources?".
use std::collections::HashMap;

use tracing::debug;

use crate::aggregate::aggregate;
use crate::cache::{CacheKey, RequestContext};
use crate::config::Config;
use crate::error::ResolveError;
use crate::gate::FeatureGate;
use crate::hierarchy::ancestor_chains_for;
use crate::permission::{self, PermissionSet};
use crate::query::{RoleSourceQuery, SubQuery};
use crate::traits::RoleStore;
use crate::types::{NamespaceId, ProjectId, Resource, UserId};

/// Resolves the effective custom-role permissions of users on groups, projects and the
/// instance.
///
/// Results are memoized in the [`RequestContext`] passed to each call, a context should live
/// exactly as long as the request it serves.
#[derive(Debug)]
pub struct MemberRoles<S, G> {
    pub(crate) store: S,
    pub(crate) gates: G,
    pub(crate) config: Config,
}

impl<S, G> MemberRoles<S, G>
where
    S: RoleStore,
    G: FeatureGate,
{
    pub fn new(store: S, gates: G, config: Config) -> Self {
        Self {
            store,
            gates,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gates(&self) -> &G {
        &self.gates
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Custom permissions of the user on each of the given resources.
    ///
    /// Every requested resource is part of the result, resources without custom role
    /// contributions map to an empty set. Without a user or resources the result is empty.
    pub async fn resolve<R: Resource>(
        &self,
        cx: &mut RequestContext,
        resources: &[R],
        user: Option<&UserId>,
    ) -> Result<HashMap<R, PermissionSet>, ResolveError<S::Error>> {
        let Some(user) = user else {
            return Ok(HashMap::new());
        };

        if resources.is_empty() {
            return Ok(HashMap::new());
        }

        self.log_resolution(
            user,
            R::KIND.as_str(),
            resources.len(),
            resources.iter().map(Resource::id),
        );

        let key = CacheKey::new(R::RESOLUTION, *user);
        cx.cache_mut()
            .fetch(&key, resources, PermissionSet::new(), async |missing: Vec<R>| {
                self.compute(&missing, user).await
            })
            .await
            .map_err(ResolveError::Store)
    }

    pub async fn resolve_projects(
        &self,
        cx: &mut RequestContext,
        projects: &[ProjectId],
        user: Option<&UserId>,
    ) -> Result<HashMap<ProjectId, PermissionSet>, ResolveError<S::Error>> {
        self.resolve(cx, projects, user).await
    }

    pub async fn resolve_groups(
        &self,
        cx: &mut RequestContext,
        groups: &[NamespaceId],
        user: Option<&UserId>,
    ) -> Result<HashMap<NamespaceId, PermissionSet>, ResolveError<S::Error>> {
        self.resolve(cx, groups, user).await
    }

    /// Diagnostic event emitted once per resolution call.
    pub(crate) fn log_resolution(
        &self,
        user: &UserId,
        kind: &str,
        resource_count: usize,
        resource_ids: impl Iterator<Item = i64>,
    ) {
        let sample: Vec<i64> = resource_ids
            .take(self.config.diagnostic_sample_size)
            .collect();
        debug!(
            user_id = %user,
            kind,
            resource_count,
            resource_ids_sample = ?sample,
            "resolving custom role permissions"
        );
    }

    async fn compute<R: Resource>(
        &self,
        resources: &[R],
        user: &UserId,
    ) -> Result<HashMap<R, PermissionSet>, S::Error> {
        let chains = ancestor_chains_for(&self.store, &self.gates, &self.config, resources).await?;

        if chains.is_empty() {
            debug!(user_id = %user, "no resource passed the custom roles gate");
            return Ok(HashMap::new());
        }

        let query = RoleSourceQuery::new(
            *user,
            chains,
            self.gates.group_link_custom_roles_enabled(),
        );
        debug!(
            user_id = %user,
            resources = query.chains().len(),
            sub_queries = ?query.sub_queries().iter().map(SubQuery::name).collect::<Vec<_>>(),
            "querying role sources"
        );

        let rows = self.store.role_sources(&query).await?;
        let enabled = permission::enabled_permissions(R::SCOPE, &self.gates, Some(user));

        Ok(aggregate(resources, rows, &enabled))
    }
}
