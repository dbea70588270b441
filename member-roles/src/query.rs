// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape of the role-source query.
//!
//! For a batch of resources the store returns every row which could contribute a custom role.
//! The query is a union of a few named sub-queries, stores are expected to answer all of them
//! in a single round-trip:
//!
//! ```text
//! project membership         (projects only) member of the project itself
//! namespace membership       member of any namespace in the ancestor chain
//! group link override        link into the chain assigns a role above the member's level
//! group link source role     link into the chain keeps the member's own role
//! ```
//!
//! The two group-link sub-queries are only part of the union when custom roles on group links
//! are switched on. Which of them picks up a given (link, membership) pair is decided by
//! [`group_link_grant`], stores must reproduce exactly its rules.
use std::collections::BTreeMap;

use crate::access::AccessLevel;
use crate::hierarchy::AncestorChain;
use crate::permission::PermissionMap;
use crate::types::{Resource, ResourceKind, UserId};

/// Named part of the role-source union.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubQuery {
    ProjectMembership,
    NamespaceMembership,
    GroupLinkOverride,
    GroupLinkSourceRole,
}

impl SubQuery {
    pub fn name(&self) -> &'static str {
        match self {
            SubQuery::ProjectMembership => "project_membership",
            SubQuery::NamespaceMembership => "namespace_membership",
            SubQuery::GroupLinkOverride => "group_link_override",
            SubQuery::GroupLinkSourceRole => "group_link_source_role",
        }
    }
}

/// Role-source query for one batch of resources of the same kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSourceQuery<R> {
    user: UserId,
    chains: BTreeMap<R, AncestorChain>,
    include_group_links: bool,
}

impl<R: Resource> RoleSourceQuery<R> {
    pub fn new(
        user: UserId,
        chains: BTreeMap<R, AncestorChain>,
        include_group_links: bool,
    ) -> Self {
        Self {
            user,
            chains,
            include_group_links,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn chains(&self) -> &BTreeMap<R, AncestorChain> {
        &self.chains
    }

    pub fn resources(&self) -> impl Iterator<Item = R> + '_ {
        self.chains.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn includes_group_links(&self) -> bool {
        self.include_group_links
    }

    /// Sub-queries making up the union, in the order their rows are returned.
    pub fn sub_queries(&self) -> Vec<SubQuery> {
        let mut sub_queries = Vec::with_capacity(4);

        if R::KIND == ResourceKind::Project {
            sub_queries.push(SubQuery::ProjectMembership);
        }

        sub_queries.push(SubQuery::NamespaceMembership);

        if self.include_group_links {
            sub_queries.push(SubQuery::GroupLinkOverride);
            sub_queries.push(SubQuery::GroupLinkSourceRole);
        }

        sub_queries
    }
}

/// Candidate row of the role-source query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSourceRow<R> {
    pub resource: R,
    pub permissions: PermissionMap,
}

impl<R> RoleSourceRow<R> {
    pub fn new(resource: R, permissions: PermissionMap) -> Self {
        Self {
            resource,
            permissions,
        }
    }
}

/// Custom role a group link assigns to the members of the shared-with group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOverride {
    None,

    /// The link references a member role. Admin roles (and dangling references) carry no base
    /// access level.
    Role { base_access_level: Option<AccessLevel> },
}

/// Role contributed by a (group link, membership) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkGrant {
    /// The link's override role.
    OverrideRole,

    /// The member's own custom role in the shared-with group.
    SourceRole,

    Nothing,
}

/// Decides which role a member of a shared-with group carries into the shared group.
///
/// - An override role whose base access level is strictly above the member's access level
///   wins.
/// - Otherwise the member keeps their own custom role. Equal levels with two custom roles
///   favour the member's role.
/// - Without an override the member's own role applies as long as the member's access level
///   stays within the link's cap.
///
/// `SubQuery::GroupLinkOverride` returns the `OverrideRole` rows and
/// `SubQuery::GroupLinkSourceRole` the `SourceRole` rows.
pub fn group_link_grant(
    link_access_level: AccessLevel,
    link_override: LinkOverride,
    member_access_level: AccessLevel,
    member_has_custom_role: bool,
) -> LinkGrant {
    match link_override {
        LinkOverride::Role {
            base_access_level: Some(base),
        } if base > member_access_level => LinkGrant::OverrideRole,
        LinkOverride::Role {
            base_access_level: Some(_),
        } if member_has_custom_role => LinkGrant::SourceRole,
        LinkOverride::Role { .. } => LinkGrant::Nothing,
        LinkOverride::None
            if member_has_custom_role && member_access_level <= link_access_level =>
        {
            LinkGrant::SourceRole
        }
        LinkOverride::None => LinkGrant::Nothing,
    }
}
