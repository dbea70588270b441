// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of custom-role permissions across namespace hierarchies.
//!
//! Users hold memberships in namespaces (groups) and projects. A membership can reference a
//! custom [`MemberRole`] which switches on permissions from a fixed catalog. Memberships are
//! inherited down the namespace tree and groups can be shared with other groups through
//! [`GroupLink`]s. [`MemberRoles`] answers which catalog permissions a user effectively holds on
//! a batch of groups or projects, or instance-wide through an admin role.
//!
//! ```rust
//! # use member_roles::{Config, MemberRoles, RequestContext, StaticGates};
//! # use member_roles::memory::MemoryStore;
//! # use member_roles::{ProjectId, UserId};
//! # async fn run() {
//! let roles = MemberRoles::new(MemoryStore::new(), StaticGates::default(), Config::default());
//!
//! let mut cx = RequestContext::new();
//! let permissions = roles
//!     .resolve_projects(&mut cx, &[ProjectId::new(1)], Some(&UserId::new(1)))
//!     .await
//!     .unwrap();
//! assert!(permissions[&ProjectId::new(1)].is_empty());
//! # }
//! ```
mod access;
mod admin;
pub mod aggregate;
pub mod cache;
mod config;
mod error;
pub mod gate;
pub mod hierarchy;
#[cfg(feature = "memory")]
pub mod memory;
pub mod permission;
pub mod query;
mod resolver;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
pub mod traits;
mod types;

pub use access::{AccessLevel, AccessLevelError};
pub use admin::Admin;
pub use cache::{RequestCache, RequestContext};
pub use config::{Config, DEFAULT_DIAGNOSTIC_SAMPLE_SIZE, Deployment};
pub use error::ResolveError;
pub use gate::{FeatureGate, PermissionFlag, StaticGates};
pub use permission::{Permission, PermissionMap, PermissionSet, Scope};
pub use resolver::MemberRoles;
pub use types::{
    GroupLink, MemberRole, MemberRoleError, MemberRoleId, Membership, MembershipSource, Namespace,
    NamespaceId, Project, ProjectId, Resource, ResourceKind, UserId,
};
