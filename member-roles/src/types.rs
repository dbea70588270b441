// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers and records the resolution engine reads: namespaces, projects, custom roles,
//! memberships and group links.
use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessLevel;
use crate::cache::ResolutionKind;
use crate::config::Deployment;
use crate::gate::FeatureGate;
use crate::permission::{Permission, PermissionMap, PermissionSet, Scope};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Opaque identifier of the user permissions are resolved for.
    UserId
);

id_type!(
    /// Identifier of a namespace (group) node in the hierarchy.
    NamespaceId
);

id_type!(
    /// Identifier of a project, always a leaf below exactly one namespace.
    ProjectId
);

id_type!(MemberRoleId);

/// Kind of resource a membership or a resolution batch refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Namespace,
    Project,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Project => "project",
        }
    }
}

/// Adapter describing a resource type permissions can be resolved for.
///
/// The resolution engine is generic over this trait, projects and namespaces (groups) differ
/// only in how their ancestor chain is derived, which catalog scope applies and under which
/// key results are cached.
pub trait Resource: Copy + Debug + Display + Eq + Hash + Ord + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Catalog scope whose enabled permissions bound the resolved sets.
    const SCOPE: Scope;

    /// Request cache partition for this resource type.
    const RESOLUTION: ResolutionKind;

    fn id(&self) -> i64;

    fn from_id(id: i64) -> Self;
}

impl Resource for ProjectId {
    const KIND: ResourceKind = ResourceKind::Project;
    const SCOPE: Scope = Scope::Project;
    const RESOLUTION: ResolutionKind = ResolutionKind::Projects;

    fn id(&self) -> i64 {
        self.as_i64()
    }

    fn from_id(id: i64) -> Self {
        Self::new(id)
    }
}

impl Resource for NamespaceId {
    const KIND: ResourceKind = ResourceKind::Namespace;
    const SCOPE: Scope = Scope::Group;
    const RESOLUTION: ResolutionKind = ResolutionKind::Groups;

    fn id(&self) -> i64 {
        self.as_i64()
    }

    fn from_id(id: i64) -> Self {
        Self::new(id)
    }
}

/// Node in the namespace tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: NamespaceId,
    pub parent_id: Option<NamespaceId>,

    /// Ids of all ancestors from the root down to and including this namespace.
    pub traversal_ids: Vec<NamespaceId>,
}

impl Namespace {
    /// Creates a namespace below the given parent, or a root namespace if no parent is given.
    pub fn new(id: NamespaceId, parent: Option<&Namespace>) -> Self {
        let mut traversal_ids = parent
            .map(|parent| parent.traversal_ids.clone())
            .unwrap_or_default();
        traversal_ids.push(id);

        Self {
            id,
            parent_id: parent.map(|parent| parent.id),
            traversal_ids,
        }
    }

    pub fn root_ancestor_id(&self) -> NamespaceId {
        self.traversal_ids.first().copied().unwrap_or(self.id)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub namespace_id: NamespaceId,
}

/// A custom role.
///
/// Regular roles are anchored to a base access level and get assigned to group or project
/// memberships. Admin roles carry no base access level and are assigned instance-wide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRole {
    pub id: MemberRoleId,
    pub name: String,

    /// Root namespace the role was defined in, `None` for instance-wide roles.
    pub namespace_id: Option<NamespaceId>,

    pub base_access_level: Option<AccessLevel>,
    pub permissions: PermissionMap,
}

impl MemberRole {
    pub fn new(id: MemberRoleId, name: &str, base_access_level: AccessLevel) -> Self {
        Self {
            id,
            name: name.to_string(),
            namespace_id: None,
            base_access_level: Some(base_access_level),
            permissions: PermissionMap::new(),
        }
    }

    pub fn admin(id: MemberRoleId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            namespace_id: None,
            base_access_level: None,
            permissions: PermissionMap::new(),
        }
    }

    pub fn in_namespace(mut self, namespace_id: NamespaceId) -> Self {
        self.namespace_id = Some(namespace_id);
        self
    }

    pub fn with_permission(mut self, permission: Permission, enabled: bool) -> Self {
        self.permissions.insert(permission, enabled);
        self
    }

    pub fn with_permissions(mut self, permissions: &[Permission]) -> Self {
        for permission in permissions {
            self.permissions.insert(*permission, true);
        }
        self
    }

    pub fn is_admin(&self) -> bool {
        self.base_access_level.is_none()
    }

    /// Permissions switched on in this role which are also rolled out to the given user.
    pub fn enabled_permissions<G: FeatureGate>(
        &self,
        gates: &G,
        user: Option<&UserId>,
    ) -> PermissionSet {
        self.permissions
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(permission, _)| *permission)
            .filter(|permission| permission.is_enabled_for(gates, user))
            .collect()
    }

    /// Returns `true` if the role grants at least one enabled admin permission while custom
    /// admin roles are switched on.
    pub fn is_admin_related<G: FeatureGate>(&self, gates: &G, user: Option<&UserId>) -> bool {
        gates.custom_admin_roles_enabled()
            && self
                .enabled_permissions(gates, user)
                .iter()
                .any(|permission| permission.applies_to(Scope::Admin))
    }

    /// Returns `true` if holding this role consumes a billable seat.
    pub fn occupies_seat(&self) -> bool {
        if self
            .base_access_level
            .is_some_and(|level| level > AccessLevel::Guest)
        {
            return true;
        }

        self.permissions
            .iter()
            .filter(|(_, enabled)| **enabled)
            .any(|(permission, _)| !permission.definition().skip_seat_consumption)
    }

    /// Checks everything about the role which doesn't depend on other stored records.
    ///
    /// Regular roles need a base access level custom roles can be anchored to. Admin roles
    /// instead need an admin permission and can't belong to a namespace. Every role switches
    /// on at least one permission, requirements of a permission are met by the role itself or
    /// by its base access level.
    pub fn validate(&self) -> Result<(), MemberRoleError> {
        if self.name.trim().is_empty() {
            return Err(MemberRoleError::MissingName);
        }

        let enabled: PermissionSet = self
            .permissions
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(permission, _)| *permission)
            .collect();

        if enabled.is_empty() {
            return Err(MemberRoleError::NoPermissions);
        }

        match (self.base_access_level, self.namespace_id) {
            (Some(level), _) if !level.is_custom_role_level() => {
                return Err(MemberRoleError::InvalidBaseAccessLevel(level));
            }
            (Some(_), _) => (),
            (None, _) if !enabled.iter().any(|permission| permission.applies_to(Scope::Admin)) => {
                return Err(MemberRoleError::MissingBaseAccessLevel);
            }
            (None, Some(namespace_id)) => {
                return Err(MemberRoleError::AdminRoleInNamespace(namespace_id));
            }
            (None, None) => (),
        }

        for permission in &enabled {
            for requirement in permission.requirements() {
                let granted_by_level = self
                    .base_access_level
                    .is_some_and(|level| requirement.is_included_in(level));

                if !enabled.contains(requirement) && !granted_by_level {
                    return Err(MemberRoleError::MissingRequirement {
                        permission: *permission,
                        requirement: *requirement,
                    });
                }
            }
        }

        Ok(())
    }

    /// Like [`MemberRole::validate`]. On SaaS regular roles also need to be defined in a
    /// namespace.
    pub fn validate_for(&self, deployment: Deployment) -> Result<(), MemberRoleError> {
        self.validate()?;

        if deployment == Deployment::Saas && !self.is_admin() && self.namespace_id.is_none() {
            return Err(MemberRoleError::NamespaceRequired);
        }

        Ok(())
    }
}

/// Reasons a member role is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemberRoleError {
    #[error("member role name can't be blank")]
    MissingName,

    #[error("cannot create a member role with no enabled permissions")]
    NoPermissions,

    #[error("base access level can't be blank for roles without admin permissions")]
    MissingBaseAccessLevel,

    #[error(
        "base access level {0} is not one of {levels}",
        levels = AccessLevel::levels_sentence()
    )]
    InvalidBaseAccessLevel(AccessLevel),

    #[error("{requirement} has to be enabled in order to enable {permission}")]
    MissingRequirement {
        permission: Permission,
        requirement: Permission,
    },

    #[error("admin roles can't belong to namespace {0}")]
    AdminRoleInNamespace(NamespaceId),

    #[error("regular member roles need a namespace")]
    NamespaceRequired,

    #[error("namespace {0} is not a top-level namespace")]
    NotTopLevel(NamespaceId),

    #[error("name '{0}' has already been taken")]
    DuplicateName(String),
}

/// What a membership grants access to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum MembershipSource {
    Namespace(NamespaceId),
    Project(ProjectId),
}

impl MembershipSource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            MembershipSource::Namespace(_) => ResourceKind::Namespace,
            MembershipSource::Project(_) => ResourceKind::Project,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            MembershipSource::Namespace(id) => id.as_i64(),
            MembershipSource::Project(id) => id.as_i64(),
        }
    }
}

impl From<NamespaceId> for MembershipSource {
    fn from(id: NamespaceId) -> Self {
        MembershipSource::Namespace(id)
    }
}

impl From<ProjectId> for MembershipSource {
    fn from(id: ProjectId) -> Self {
        MembershipSource::Project(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub source: MembershipSource,
    pub access_level: AccessLevel,
    pub member_role_id: Option<MemberRoleId>,
}

impl Membership {
    pub fn new(user_id: UserId, source: MembershipSource, access_level: AccessLevel) -> Self {
        Self {
            user_id,
            source,
            access_level,
            member_role_id: None,
        }
    }

    pub fn with_member_role(mut self, member_role_id: MemberRoleId) -> Self {
        self.member_role_id = Some(member_role_id);
        self
    }
}

/// Grants the members of `shared_with_group_id` access into `shared_group_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLink {
    pub shared_group_id: NamespaceId,
    pub shared_with_group_id: NamespaceId,

    /// Highest access level members of the shared-with group receive through this link.
    pub access_level: AccessLevel,

    /// Custom role the link assigns instead of the member's own role.
    pub member_role_id: Option<MemberRoleId>,
}

impl GroupLink {
    pub fn new(
        shared_group_id: NamespaceId,
        shared_with_group_id: NamespaceId,
        access_level: AccessLevel,
    ) -> Self {
        Self {
            shared_group_id,
            shared_with_group_id,
            access_level,
            member_role_id: None,
        }
    }

    pub fn with_member_role(mut self, member_role_id: MemberRoleId) -> Self {
        self.member_role_id = Some(member_role_id);
        self
    }
}
