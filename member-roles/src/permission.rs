// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog of all customizable permissions.
//!
//! Every permission key a custom role can switch on is a variant of the closed [`Permission`]
//! enum. Each key declares the scopes it applies to: a key can be meaningful on groups, on
//! projects, on both, or only instance-wide for admin roles. Which of them are usable at a
//! given moment additionally depends on per-permission rollout flags, see [`FeatureGate`].
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessLevel;
use crate::gate::FeatureGate;
use crate::types::UserId;

/// Permission keys mapped to whether a role switches them on.
pub type PermissionMap = BTreeMap<Permission, bool>;

/// Resolved set of permissions.
pub type PermissionSet = BTreeSet<Permission>;

/// Scope a permission can be granted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Group,
    Project,
    Admin,
}

/// Static description of a permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub group_ability: bool,
    pub project_ability: bool,
    pub admin_ability: bool,

    /// Holding only this permission on a guest role does not consume a billable seat.
    pub skip_seat_consumption: bool,

    /// Permissions which need to be granted as well for this one to be switched on.
    pub requirements: &'static [Permission],

    /// Lowest built-in access level which already grants this permission.
    pub included_from: Option<AccessLevel>,
}

impl PermissionDefinition {
    const fn regular(
        name: &'static str,
        description: &'static str,
        group_ability: bool,
        project_ability: bool,
    ) -> Self {
        Self {
            name,
            description,
            group_ability,
            project_ability,
            admin_ability: false,
            skip_seat_consumption: false,
            requirements: &[],
            included_from: None,
        }
    }

    const fn admin(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            group_ability: false,
            project_ability: false,
            admin_ability: true,
            skip_seat_consumption: false,
            requirements: &[],
            included_from: None,
        }
    }

    const fn skip_seat_consumption(mut self) -> Self {
        self.skip_seat_consumption = true;
        self
    }

    const fn requires(mut self, requirements: &'static [Permission]) -> Self {
        self.requirements = requirements;
        self
    }

    const fn included_from(mut self, level: AccessLevel) -> Self {
        self.included_from = Some(level);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AdminCicdVariables,
    AdminComplianceFramework,
    AdminGroupMember,
    AdminIntegrations,
    AdminMergeRequest,
    AdminProtectedBranch,
    AdminPushRules,
    AdminRunners,
    AdminTerraformState,
    AdminVulnerability,
    AdminWebHook,
    ArchiveProject,
    ManageDeployTokens,
    ManageGroupAccessTokens,
    ManageProjectAccessTokens,
    ManageSecurityPolicyLink,
    ReadCode,
    ReadCrmContact,
    ReadDependency,
    ReadRunners,
    ReadVulnerability,
    RemoveGroup,
    RemoveProject,
    ReadAdminCicd,
    ReadAdminDashboard,
    ReadAdminMonitoring,
    ReadAdminSubscription,
    ReadAdminUsers,
}

impl Permission {
    pub const ALL: [Permission; 28] = [
        Permission::AdminCicdVariables,
        Permission::AdminComplianceFramework,
        Permission::AdminGroupMember,
        Permission::AdminIntegrations,
        Permission::AdminMergeRequest,
        Permission::AdminProtectedBranch,
        Permission::AdminPushRules,
        Permission::AdminRunners,
        Permission::AdminTerraformState,
        Permission::AdminVulnerability,
        Permission::AdminWebHook,
        Permission::ArchiveProject,
        Permission::ManageDeployTokens,
        Permission::ManageGroupAccessTokens,
        Permission::ManageProjectAccessTokens,
        Permission::ManageSecurityPolicyLink,
        Permission::ReadCode,
        Permission::ReadCrmContact,
        Permission::ReadDependency,
        Permission::ReadRunners,
        Permission::ReadVulnerability,
        Permission::RemoveGroup,
        Permission::RemoveProject,
        Permission::ReadAdminCicd,
        Permission::ReadAdminDashboard,
        Permission::ReadAdminMonitoring,
        Permission::ReadAdminSubscription,
        Permission::ReadAdminUsers,
    ];

    pub const fn definition(&self) -> PermissionDefinition {
        use PermissionDefinition as D;

        match self {
            Permission::AdminCicdVariables => D::regular(
                "admin_cicd_variables",
                "Create, read, update and delete CI/CD variables.",
                true,
                true,
            ),
            Permission::AdminComplianceFramework => D::regular(
                "admin_compliance_framework",
                "Create, read, update and delete compliance frameworks.",
                true,
                true,
            ),
            Permission::AdminGroupMember => D::regular(
                "admin_group_member",
                "Add or remove users in a group and assign roles to them.",
                true,
                false,
            ),
            Permission::AdminIntegrations => D::regular(
                "admin_integrations",
                "Create, read, update and delete integrations with external applications.",
                true,
                true,
            ),
            Permission::AdminMergeRequest => D::regular(
                "admin_merge_request",
                "Approve merge requests and change their settings.",
                true,
                true,
            ),
            Permission::AdminProtectedBranch => D::regular(
                "admin_protected_branch",
                "Create, read, update and delete protected branches.",
                false,
                true,
            ),
            Permission::AdminPushRules => D::regular(
                "admin_push_rules",
                "Configure push rules for repositories.",
                true,
                true,
            ),
            Permission::AdminRunners => D::regular(
                "admin_runners",
                "Create, view, edit and delete runners.",
                true,
                true,
            ),
            Permission::AdminTerraformState => D::regular(
                "admin_terraform_state",
                "Execute Terraform commands and manage Terraform state files.",
                false,
                true,
            ),
            Permission::AdminVulnerability => D::regular(
                "admin_vulnerability",
                "Edit the status, linked issue and severity of vulnerabilities.",
                true,
                true,
            )
            .requires(&[Permission::ReadVulnerability]),
            Permission::AdminWebHook => D::regular(
                "admin_web_hook",
                "Manage webhooks.",
                true,
                true,
            ),
            Permission::ArchiveProject => D::regular(
                "archive_project",
                "Allows archiving of projects.",
                false,
                true,
            ),
            Permission::ManageDeployTokens => D::regular(
                "manage_deploy_tokens",
                "Manage deploy tokens.",
                true,
                true,
            ),
            Permission::ManageGroupAccessTokens => D::regular(
                "manage_group_access_tokens",
                "Create, read, update and delete group access tokens.",
                true,
                false,
            ),
            Permission::ManageProjectAccessTokens => D::regular(
                "manage_project_access_tokens",
                "Create, read, update and delete project access tokens.",
                false,
                true,
            ),
            Permission::ManageSecurityPolicyLink => D::regular(
                "manage_security_policy_link",
                "Link security policy projects.",
                true,
                true,
            ),
            Permission::ReadCode => D::regular(
                "read_code",
                "Allows read-only access to the source code.",
                true,
                true,
            )
            .skip_seat_consumption()
            .included_from(AccessLevel::Reporter),
            Permission::ReadCrmContact => D::regular(
                "read_crm_contact",
                "Read CRM contact.",
                true,
                false,
            ),
            Permission::ReadDependency => D::regular(
                "read_dependency",
                "Allows read-only access to the dependencies and licenses.",
                true,
                true,
            )
            .included_from(AccessLevel::Developer),
            Permission::ReadRunners => D::regular(
                "read_runners",
                "Allows read-only access to runners.",
                true,
                true,
            ),
            Permission::ReadVulnerability => D::regular(
                "read_vulnerability",
                "Read vulnerability reports and security dashboards.",
                true,
                true,
            )
            .included_from(AccessLevel::Developer),
            Permission::RemoveGroup => D::regular(
                "remove_group",
                "Ability to delete or restore a group.",
                true,
                false,
            ),
            Permission::RemoveProject => D::regular(
                "remove_project",
                "Allows deletion of projects.",
                false,
                true,
            ),
            Permission::ReadAdminCicd => {
                D::admin("read_admin_cicd", "Read CI/CD details for the instance.")
            }
            Permission::ReadAdminDashboard => {
                D::admin("read_admin_dashboard", "Read the admin dashboard.")
            }
            Permission::ReadAdminMonitoring => D::admin(
                "read_admin_monitoring",
                "Read system information, background migrations and health checks.",
            ),
            Permission::ReadAdminSubscription => D::admin(
                "read_admin_subscription",
                "Read subscription details for the instance.",
            ),
            Permission::ReadAdminUsers => {
                D::admin("read_admin_users", "Read the user list and user details.")
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    pub fn requirements(&self) -> &'static [Permission] {
        self.definition().requirements
    }

    /// Returns `true` if members with the given built-in access level hold this permission
    /// without any custom role.
    pub fn is_included_in(&self, level: AccessLevel) -> bool {
        self.definition()
            .included_from
            .is_some_and(|included_from| level >= included_from)
    }

    /// Name of the rollout flag gating this permission.
    pub fn flag_name(&self) -> String {
        format!("custom_ability_{}", self.name())
    }

    pub fn applies_to(&self, scope: Scope) -> bool {
        let definition = self.definition();
        match scope {
            Scope::Group => definition.group_ability,
            Scope::Project => definition.project_ability,
            Scope::Admin => definition.admin_ability,
        }
    }

    /// Returns `true` unless the permission sits behind a rollout flag which is not enabled
    /// for this user.
    pub fn is_enabled_for<G: FeatureGate>(&self, gates: &G, user: Option<&UserId>) -> bool {
        gates.permission_flag(*self, user).unwrap_or(true)
    }

    /// All permissions of this scope.
    pub fn all_in(scope: Scope) -> impl Iterator<Item = Permission> {
        Self::ALL
            .into_iter()
            .filter(move |permission| permission.applies_to(scope))
    }

    /// Permissions which differ from a regular guest and therefore consume a seat.
    pub fn elevating() -> impl Iterator<Item = Permission> {
        Self::ALL
            .into_iter()
            .filter(|permission| !permission.definition().skip_seat_consumption)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.name() == s)
            .ok_or_else(|| PermissionError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unknown permission '{0}'")]
    Unknown(String),
}

/// Permissions of a scope which are currently enabled for the given user.
pub fn enabled_permissions<G: FeatureGate>(
    scope: Scope,
    gates: &G,
    user: Option<&UserId>,
) -> PermissionSet {
    Permission::all_in(scope)
        .filter(|permission| permission.is_enabled_for(gates, user))
        .collect()
}

pub fn enabled_group_permissions<G: FeatureGate>(
    gates: &G,
    user: Option<&UserId>,
) -> PermissionSet {
    enabled_permissions(Scope::Group, gates, user)
}

pub fn enabled_project_permissions<G: FeatureGate>(
    gates: &G,
    user: Option<&UserId>,
) -> PermissionSet {
    enabled_permissions(Scope::Project, gates, user)
}

pub fn enabled_admin_permissions<G: FeatureGate>(
    gates: &G,
    user: Option<&UserId>,
) -> PermissionSet {
    enabled_permissions(Scope::Admin, gates, user)
}
