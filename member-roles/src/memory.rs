// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::rc::Rc;

use thiserror::Error;

use crate::hierarchy::AncestorChain;
use crate::query::{
    LinkGrant, LinkOverride, RoleSourceQuery, RoleSourceRow, SubQuery, group_link_grant,
};
use crate::traits::{RoleStore, WriteRoleStore};
use crate::types::{
    GroupLink, MemberRole, MemberRoleError, MemberRoleId, Membership, MembershipSource, Namespace,
    NamespaceId, Project, ProjectId, Resource, ResourceKind, UserId,
};

/// In-memory role store.
///
/// This does not persist data permamently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    namespaces: BTreeMap<NamespaceId, Namespace>,
    projects: BTreeMap<ProjectId, Project>,
    member_roles: BTreeMap<MemberRoleId, MemberRole>,

    // Kept in insertion order, rows are returned in the same order.
    memberships: Vec<Membership>,
    group_links: Vec<GroupLink>,

    admin_roles: BTreeMap<UserId, MemberRoleId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStoreInner {
    fn traversal_ids(&self, kind: ResourceKind, id: i64) -> Option<Vec<NamespaceId>> {
        let namespace_id = match kind {
            ResourceKind::Namespace => NamespaceId::new(id),
            ResourceKind::Project => self.projects.get(&ProjectId::new(id))?.namespace_id,
        };

        self.namespaces
            .get(&namespace_id)
            .map(|namespace| namespace.traversal_ids.clone())
    }

    fn role(&self, id: Option<MemberRoleId>) -> Option<&MemberRole> {
        id.and_then(|id| self.member_roles.get(&id))
    }

    fn memberships_of<'a>(
        &'a self,
        user: &'a UserId,
    ) -> impl Iterator<Item = &'a Membership> + 'a {
        self.memberships
            .iter()
            .filter(move |membership| &membership.user_id == user)
    }

    /// Evaluates one sub-query for one resource and pushes the permission maps of all matching
    /// roles.
    fn evaluate<R: Resource>(
        &self,
        sub_query: SubQuery,
        user: &UserId,
        resource: R,
        chain: &AncestorChain,
        rows: &mut Vec<RoleSourceRow<R>>,
    ) {
        match sub_query {
            SubQuery::ProjectMembership => {
                for membership in self.memberships_of(user) {
                    let MembershipSource::Project(project) = membership.source else {
                        continue;
                    };
                    if project.as_i64() != resource.id() {
                        continue;
                    }
                    if let Some(role) = self.role(membership.member_role_id) {
                        rows.push(RoleSourceRow::new(resource, role.permissions.clone()));
                    }
                }
            }
            SubQuery::NamespaceMembership => {
                for membership in self.memberships_of(user) {
                    let MembershipSource::Namespace(namespace) = membership.source else {
                        continue;
                    };
                    if !chain.contains(&namespace) {
                        continue;
                    }
                    if let Some(role) = self.role(membership.member_role_id) {
                        rows.push(RoleSourceRow::new(resource, role.permissions.clone()));
                    }
                }
            }
            SubQuery::GroupLinkOverride | SubQuery::GroupLinkSourceRole => {
                for link in &self.group_links {
                    if !chain.contains(&link.shared_group_id) {
                        continue;
                    }

                    let link_role = self.role(link.member_role_id);
                    let link_override = match link.member_role_id {
                        None => LinkOverride::None,
                        Some(_) => LinkOverride::Role {
                            base_access_level: link_role.and_then(|role| role.base_access_level),
                        },
                    };

                    for membership in self.memberships_of(user) {
                        let source = MembershipSource::Namespace(link.shared_with_group_id);
                        if membership.source != source {
                            continue;
                        }

                        let member_role = self.role(membership.member_role_id);
                        let grant = group_link_grant(
                            link.access_level,
                            link_override,
                            membership.access_level,
                            member_role.is_some(),
                        );

                        let role = match (sub_query, grant) {
                            (SubQuery::GroupLinkOverride, LinkGrant::OverrideRole) => link_role,
                            (SubQuery::GroupLinkSourceRole, LinkGrant::SourceRole) => member_role,
                            _ => None,
                        };

                        if let Some(role) = role {
                            rows.push(RoleSourceRow::new(resource, role.permissions.clone()));
                        }
                    }
                }
            }
        }
    }
}

impl RoleStore for MemoryStore {
    type Error = Infallible;

    async fn ancestor_chains<R: Resource>(
        &self,
        resources: &[R],
    ) -> Result<BTreeMap<R, AncestorChain>, Infallible> {
        let inner = self.inner.borrow();
        Ok(resources
            .iter()
            .filter_map(|resource| {
                let ids = inner.traversal_ids(R::KIND, resource.id())?;
                AncestorChain::new(ids).map(|chain| (*resource, chain))
            })
            .collect())
    }

    async fn namespaces_with_member_roles(
        &self,
        roots: &BTreeSet<NamespaceId>,
    ) -> Result<BTreeSet<NamespaceId>, Infallible> {
        Ok(self
            .inner
            .borrow()
            .member_roles
            .values()
            .filter_map(|role| role.namespace_id)
            .filter(|namespace| roots.contains(namespace))
            .collect())
    }

    async fn role_sources<R: Resource>(
        &self,
        query: &RoleSourceQuery<R>,
    ) -> Result<Vec<RoleSourceRow<R>>, Infallible> {
        let inner = self.inner.borrow();
        let mut rows = Vec::new();

        for sub_query in query.sub_queries() {
            for (resource, chain) in query.chains() {
                inner.evaluate(sub_query, query.user(), *resource, chain, &mut rows);
            }
        }

        Ok(rows)
    }

    async fn admin_role(&self, user: &UserId) -> Result<Option<MemberRole>, Infallible> {
        let inner = self.inner.borrow();
        Ok(inner.role(inner.admin_roles.get(user).copied()).cloned())
    }
}

impl WriteRoleStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn insert_namespace(
        &self,
        id: NamespaceId,
        parent: Option<NamespaceId>,
    ) -> Result<(), MemoryStoreError> {
        let mut inner = self.inner.borrow_mut();

        let namespace = match parent {
            Some(parent_id) => {
                let parent = inner
                    .namespaces
                    .get(&parent_id)
                    .ok_or(MemoryStoreError::UnknownParent(parent_id))?;
                Namespace::new(id, Some(parent))
            }
            None => Namespace::new(id, None),
        };

        inner.namespaces.insert(id, namespace);
        Ok(())
    }

    async fn insert_project(
        &self,
        id: ProjectId,
        namespace: NamespaceId,
    ) -> Result<(), MemoryStoreError> {
        let mut inner = self.inner.borrow_mut();

        if !inner.namespaces.contains_key(&namespace) {
            return Err(MemoryStoreError::UnknownNamespace(namespace));
        }

        inner.projects.insert(
            id,
            Project {
                id,
                namespace_id: namespace,
            },
        );
        Ok(())
    }

    async fn insert_member_role(&self, role: MemberRole) -> Result<(), MemoryStoreError> {
        role.validate()?;

        let mut inner = self.inner.borrow_mut();

        if let Some(namespace_id) = role.namespace_id {
            let namespace = inner
                .namespaces
                .get(&namespace_id)
                .ok_or(MemoryStoreError::UnknownNamespace(namespace_id))?;
            if !namespace.is_root() {
                return Err(MemberRoleError::NotTopLevel(namespace_id).into());
            }
        }

        let name_taken = inner.member_roles.values().any(|existing| {
            existing.id != role.id
                && existing.namespace_id == role.namespace_id
                && existing.name == role.name
        });
        if name_taken {
            return Err(MemberRoleError::DuplicateName(role.name).into());
        }

        inner.member_roles.insert(role.id, role);
        Ok(())
    }

    async fn insert_membership(&self, membership: Membership) -> Result<(), MemoryStoreError> {
        let mut inner = self.inner.borrow_mut();

        match inner.memberships.iter_mut().find(|existing| {
            existing.user_id == membership.user_id && existing.source == membership.source
        }) {
            Some(existing) => *existing = membership,
            None => inner.memberships.push(membership),
        }
        Ok(())
    }

    async fn insert_group_link(&self, link: GroupLink) -> Result<(), MemoryStoreError> {
        let mut inner = self.inner.borrow_mut();

        match inner.group_links.iter_mut().find(|existing| {
            existing.shared_group_id == link.shared_group_id
                && existing.shared_with_group_id == link.shared_with_group_id
        }) {
            Some(existing) => *existing = link,
            None => inner.group_links.push(link),
        }
        Ok(())
    }

    async fn assign_admin_role(
        &self,
        user: UserId,
        role: MemberRoleId,
    ) -> Result<(), MemoryStoreError> {
        self.inner.borrow_mut().admin_roles.insert(user, role);
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("namespace {0} does not exist")]
    UnknownNamespace(NamespaceId),

    #[error("parent namespace {0} does not exist")]
    UnknownParent(NamespaceId),

    #[error(transparent)]
    MemberRole(#[from] MemberRoleError),
}
