// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;

use crate::access::AccessLevel;
use crate::config::Deployment;
use crate::hierarchy::AncestorChain;
use crate::query::{RoleSourceQuery, RoleSourceRow};
use crate::types::{
    GroupLink, MemberRole, MemberRoleError, MemberRoleId, Membership, NamespaceId, ProjectId,
    Resource, UserId,
};

/// Read interface the resolution engine uses to look up hierarchies and role assignments.
///
/// Every method answers a whole batch in one round-trip, the engine never queries per
/// resource.
pub trait RoleStore {
    type Error: Error + 'static;

    /// Ancestor chains of the given resources.
    ///
    /// Resources unknown to the store are left out of the result.
    fn ancestor_chains<R: Resource>(
        &self,
        resources: &[R],
    ) -> impl Future<Output = Result<BTreeMap<R, AncestorChain>, Self::Error>>;

    /// Returns the subset of the given root namespaces which define at least one member role.
    fn namespaces_with_member_roles(
        &self,
        roots: &BTreeSet<NamespaceId>,
    ) -> impl Future<Output = Result<BTreeSet<NamespaceId>, Self::Error>>;

    /// Runs the role-source union for one batch, see [`crate::query`].
    ///
    /// Rows are not deduplicated.
    fn role_sources<R: Resource>(
        &self,
        query: &RoleSourceQuery<R>,
    ) -> impl Future<Output = Result<Vec<RoleSourceRow<R>>, Self::Error>>;

    /// Admin role assigned to the user, if any.
    fn admin_role(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<MemberRole>, Self::Error>>;
}

/// Write interface populating a role store.
pub trait WriteRoleStore {
    type Error: Error + From<MemberRoleError> + 'static;

    /// Inserts a namespace below the given parent. The parent needs to exist already.
    fn insert_namespace(
        &self,
        id: NamespaceId,
        parent: Option<NamespaceId>,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    fn insert_project(
        &self,
        id: ProjectId,
        namespace: NamespaceId,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Inserts or replaces a member role.
    ///
    /// The role is checked with [`MemberRole::validate`]. A namespace it belongs to needs to
    /// exist and be a root, and its name can't be taken by another role of the same namespace.
    fn insert_member_role(&self, role: MemberRole) -> impl Future<Output = Result<(), Self::Error>>;

    /// Inserts a membership. An existing membership of the same user in the same source is
    /// replaced.
    fn insert_membership(
        &self,
        membership: Membership,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Inserts a group link. An existing link between the same groups is replaced.
    fn insert_group_link(&self, link: GroupLink) -> impl Future<Output = Result<(), Self::Error>>;

    /// Assigns an admin role to a user, replacing a previous assignment.
    fn assign_admin_role(
        &self,
        user: UserId,
        role: MemberRoleId,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Convenience methods on top of [`WriteRoleStore`].
pub trait WriteRoleStoreExt: WriteRoleStore {
    /// Adds a user to a namespace, optionally with a custom role.
    fn add_namespace_member(
        &self,
        user: UserId,
        namespace: NamespaceId,
        access_level: AccessLevel,
        role: Option<MemberRoleId>,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        let mut membership = Membership::new(user, namespace.into(), access_level);
        membership.member_role_id = role;
        self.insert_membership(membership)
    }

    /// Inserts a member role after checking the rules of the given deployment.
    fn create_member_role(
        &self,
        role: MemberRole,
        deployment: Deployment,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        async move {
            role.validate_for(deployment)?;
            self.insert_member_role(role).await
        }
    }

    /// Adds a user to a project, optionally with a custom role.
    fn add_project_member(
        &self,
        user: UserId,
        project: ProjectId,
        access_level: AccessLevel,
        role: Option<MemberRoleId>,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        let mut membership = Membership::new(user, project.into(), access_level);
        membership.member_role_id = role;
        self.insert_membership(membership)
    }
}

impl<S: WriteRoleStore> WriteRoleStoreExt for S {}
