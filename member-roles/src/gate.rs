// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::permission::Permission;
use crate::types::{NamespaceId, UserId};

/// Interface to license and feature-flag checks.
///
/// A closed gate is never an error: it simply means custom roles don't contribute any
/// permissions.
pub trait FeatureGate {
    /// Returns `true` if custom roles are licensed. `root` is the root namespace of the
    /// hierarchy in question, `None` asks for the instance license.
    fn custom_roles_licensed(&self, root: Option<NamespaceId>) -> bool;

    /// Returns `true` if custom roles assigned on group links are taken into account.
    fn group_link_custom_roles_enabled(&self) -> bool;

    /// Returns `true` if instance-wide admin roles are switched on.
    fn custom_admin_roles_enabled(&self) -> bool;

    /// State of the rollout flag of a permission for a user.
    ///
    /// Returns `None` if no rollout flag exists for that permission.
    fn permission_flag(&self, permission: Permission, user: Option<&UserId>) -> Option<bool>;
}

impl<G: FeatureGate> FeatureGate for &G {
    fn custom_roles_licensed(&self, root: Option<NamespaceId>) -> bool {
        (*self).custom_roles_licensed(root)
    }

    fn group_link_custom_roles_enabled(&self) -> bool {
        (*self).group_link_custom_roles_enabled()
    }

    fn custom_admin_roles_enabled(&self) -> bool {
        (*self).custom_admin_roles_enabled()
    }

    fn permission_flag(&self, permission: Permission, user: Option<&UserId>) -> Option<bool> {
        (*self).permission_flag(permission, user)
    }
}

/// Rollout state of a single permission flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionFlag {
    Enabled,
    Disabled,

    /// Enabled only for the listed users.
    Actors(BTreeSet<UserId>),
}

/// Gates read from static configuration.
///
/// Everything is switched on by default.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticGates {
    /// Instance-wide custom roles license.
    pub custom_roles: bool,

    /// Root namespaces without a license, even if the instance is licensed.
    pub unlicensed_namespaces: BTreeSet<NamespaceId>,

    pub group_link_custom_roles: bool,
    pub custom_admin_roles: bool,
    pub permission_flags: BTreeMap<Permission, PermissionFlag>,
}

impl Default for StaticGates {
    fn default() -> Self {
        Self {
            custom_roles: true,
            unlicensed_namespaces: BTreeSet::new(),
            group_link_custom_roles: true,
            custom_admin_roles: true,
            permission_flags: BTreeMap::new(),
        }
    }
}

impl StaticGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_roles(mut self, licensed: bool) -> Self {
        self.custom_roles = licensed;
        self
    }

    pub fn with_unlicensed_namespace(mut self, root: NamespaceId) -> Self {
        self.unlicensed_namespaces.insert(root);
        self
    }

    pub fn with_group_link_custom_roles(mut self, enabled: bool) -> Self {
        self.group_link_custom_roles = enabled;
        self
    }

    pub fn with_custom_admin_roles(mut self, enabled: bool) -> Self {
        self.custom_admin_roles = enabled;
        self
    }

    pub fn with_permission_flag(mut self, permission: Permission, flag: PermissionFlag) -> Self {
        self.permission_flags.insert(permission, flag);
        self
    }
}

impl FeatureGate for StaticGates {
    fn custom_roles_licensed(&self, root: Option<NamespaceId>) -> bool {
        match root {
            Some(root) => self.custom_roles && !self.unlicensed_namespaces.contains(&root),
            None => self.custom_roles,
        }
    }

    fn group_link_custom_roles_enabled(&self) -> bool {
        self.group_link_custom_roles
    }

    fn custom_admin_roles_enabled(&self) -> bool {
        self.custom_admin_roles
    }

    fn permission_flag(&self, permission: Permission, user: Option<&UserId>) -> Option<bool> {
        self.permission_flags.get(&permission).map(|flag| match flag {
            PermissionFlag::Enabled => true,
            PermissionFlag::Disabled => false,
            PermissionFlag::Actors(actors) => user.is_some_and(|user| actors.contains(user)),
        })
    }
}
