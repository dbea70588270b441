// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheKey, RequestContext, ResolutionKind};
use crate::error::ResolveError;
use crate::gate::FeatureGate;
use crate::permission::{PermissionSet, Scope};
use crate::resolver::MemberRoles;
use crate::traits::RoleStore;
use crate::types::UserId;

/// The instance as the single "resource" admin permissions are resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Admin;

impl<S, G> MemberRoles<S, G>
where
    S: RoleStore,
    G: FeatureGate,
{
    /// Admin permissions granted to the user through their admin role.
    ///
    /// Returns an empty set when custom admin roles are switched off or not licensed.
    pub async fn resolve_admin(
        &self,
        cx: &mut RequestContext,
        user: Option<&UserId>,
    ) -> Result<PermissionSet, ResolveError<S::Error>> {
        let Some(user) = user else {
            return Ok(PermissionSet::new());
        };

        // The instance is the only resource, it has no id of its own.
        self.log_resolution(user, "admin", 1, std::iter::empty());

        if !self.gates.custom_admin_roles_enabled() || !self.gates.custom_roles_licensed(None) {
            debug!(user_id = %user, "custom admin roles are not available");
            return Ok(PermissionSet::new());
        }

        let key = CacheKey::new(ResolutionKind::Admin, *user);
        let mut result = cx
            .cache_mut()
            .fetch(&key, &[Admin], PermissionSet::new(), async |_: Vec<Admin>| {
                self.admin_permissions(user).await
            })
            .await
            .map_err(ResolveError::Store)?;

        Ok(result.remove(&Admin).unwrap_or_default())
    }

    async fn admin_permissions(
        &self,
        user: &UserId,
    ) -> Result<HashMap<Admin, PermissionSet>, S::Error> {
        let Some(role) = self.store.admin_role(user).await? else {
            return Ok(HashMap::new());
        };

        let permissions: PermissionSet = role
            .enabled_permissions(&self.gates, Some(user))
            .into_iter()
            .filter(|permission| permission.applies_to(Scope::Admin))
            .collect();

        debug!(
            user_id = %user,
            member_role_id = %role.id,
            permissions = permissions.len(),
            "resolved admin role"
        );

        Ok(HashMap::from([(Admin, permissions)]))
    }
}
