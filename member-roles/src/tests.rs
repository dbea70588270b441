// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashMap};

use assert_matches::assert_matches;
use tracing_subscriber::layer::SubscriberExt;

use crate::access::AccessLevel;
use crate::assert_all_stores;
use crate::cache::RequestContext;
use crate::config::{Config, Deployment};
use crate::error::ResolveError;
use crate::gate::{PermissionFlag, StaticGates};
use crate::memory::MemoryStore;
use crate::permission::{Permission, PermissionSet};
use crate::resolver::MemberRoles;
use crate::sqlite::SqliteStore;
use crate::test_utils::{
    CountingStore, EventRecorder, StoreCall, TestStoreError, custom_role, setup_logging,
};
use crate::traits::{WriteRoleStore, WriteRoleStoreExt};
use crate::types::{
    GroupLink, MemberRole, MemberRoleError, MemberRoleId, NamespaceId, ProjectId, UserId,
};

const USER: UserId = UserId::new(1);

const ROOT: NamespaceId = NamespaceId::new(1);
const SUBGROUP: NamespaceId = NamespaceId::new(2);
const SHARED_WITH: NamespaceId = NamespaceId::new(3);

const PROJECT: ProjectId = ProjectId::new(10);
const OTHER_PROJECT: ProjectId = ProjectId::new(11);

const READ_CODE_ROLE: MemberRoleId = MemberRoleId::new(1);
const VULNERABILITY_ROLE: MemberRoleId = MemberRoleId::new(2);
const LINK_ROLE: MemberRoleId = MemberRoleId::new(3);
const MEMBER_ROLE: MemberRoleId = MemberRoleId::new(4);

/// Root group with a subgroup holding two projects, plus a second root to share the first one
/// with.
///
/// ```text
/// ROOT (1)             SHARED_WITH (3)
///  └─ SUBGROUP (2)
///      ├─ PROJECT (10)
///      └─ OTHER_PROJECT (11)
/// ```
async fn hierarchy<S: WriteRoleStore>(store: &S) {
    store.insert_namespace(ROOT, None).await.unwrap();
    store.insert_namespace(SUBGROUP, Some(ROOT)).await.unwrap();
    store.insert_namespace(SHARED_WITH, None).await.unwrap();
    store.insert_project(PROJECT, SUBGROUP).await.unwrap();
    store.insert_project(OTHER_PROJECT, SUBGROUP).await.unwrap();

    store
        .insert_member_role(
            custom_role(READ_CODE_ROLE.as_i64(), AccessLevel::Guest, &[Permission::ReadCode])
                .in_namespace(ROOT),
        )
        .await
        .unwrap();
    store
        .insert_member_role(
            custom_role(
                VULNERABILITY_ROLE.as_i64(),
                AccessLevel::Guest,
                &[Permission::ReadVulnerability],
            )
            .in_namespace(ROOT),
        )
        .await
        .unwrap();
}

/// Shares ROOT with SHARED_WITH, the link assigns a Maintainer-based role.
async fn group_link<S: WriteRoleStore>(
    store: &S,
    member_level: AccessLevel,
    member_base: AccessLevel,
) {
    store
        .insert_member_role(
            custom_role(
                LINK_ROLE.as_i64(),
                AccessLevel::Maintainer,
                &[Permission::AdminMergeRequest],
            )
            .in_namespace(ROOT),
        )
        .await
        .unwrap();
    store
        .insert_member_role(
            custom_role(MEMBER_ROLE.as_i64(), member_base, &[Permission::ReadDependency])
                .in_namespace(SHARED_WITH),
        )
        .await
        .unwrap();
    store
        .insert_group_link(
            GroupLink::new(ROOT, SHARED_WITH, AccessLevel::Maintainer)
                .with_member_role(LINK_ROLE),
        )
        .await
        .unwrap();
    store
        .add_namespace_member(USER, SHARED_WITH, member_level, Some(MEMBER_ROLE))
        .await
        .unwrap();
}

fn set(permissions: &[Permission]) -> PermissionSet {
    permissions.iter().copied().collect()
}

fn roles<S>(store: &S) -> MemberRoles<S, StaticGates>
where
    S: Clone + crate::traits::RoleStore,
{
    MemberRoles::new(store.clone(), StaticGates::default(), Config::default())
}

#[tokio::test]
async fn empty_input_resolves_to_nothing() {
    setup_logging();

    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    let roles = roles(&store);
    let mut cx = RequestContext::new();

    assert!(roles.resolve_projects(&mut cx, &[], Some(&USER)).await.unwrap().is_empty());
    assert!(roles.resolve_projects(&mut cx, &[PROJECT], None).await.unwrap().is_empty());
    assert!(roles.resolve_groups(&mut cx, &[], None).await.unwrap().is_empty());
    assert_eq!(roles.resolve_admin(&mut cx, None).await.unwrap(), PermissionSet::new());

    assert!(store.calls().is_empty());
    assert!(cx.cache().is_empty());
}

#[tokio::test]
async fn direct_and_inherited_roles_are_unioned() {
    setup_logging();

    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        store
            .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
            .await
            .unwrap();
        store
            .add_project_member(USER, PROJECT, AccessLevel::Guest, Some(VULNERABILITY_ROLE))
            .await
            .unwrap();

        let roles = roles(&store);
        let mut cx = RequestContext::new();

        let result = roles
            .resolve_projects(&mut cx, &[PROJECT, OTHER_PROJECT], Some(&USER))
            .await
            .unwrap();
        assert_eq!(
            result,
            HashMap::from([
                (
                    PROJECT,
                    set(&[Permission::ReadCode, Permission::ReadVulnerability])
                ),
                (OTHER_PROJECT, set(&[Permission::ReadCode])),
            ])
        );

        let result = roles
            .resolve_groups(&mut cx, &[ROOT, SUBGROUP, SHARED_WITH], Some(&USER))
            .await
            .unwrap();
        assert_eq!(
            result,
            HashMap::from([
                (ROOT, set(&[Permission::ReadCode])),
                (SUBGROUP, set(&[Permission::ReadCode])),
                (SHARED_WITH, PermissionSet::new()),
            ])
        );

        // Other users don't see anything.
        let result = roles
            .resolve_projects(&mut cx, &[PROJECT], Some(&UserId::new(2)))
            .await
            .unwrap();
        assert_eq!(result, HashMap::from([(PROJECT, PermissionSet::new())]));
    });
}

#[tokio::test]
async fn switched_off_permission_does_not_revoke_other_grants() {
    setup_logging();

    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        store
            .insert_member_role(
                custom_role(
                    MEMBER_ROLE.as_i64(),
                    AccessLevel::Guest,
                    &[Permission::ReadVulnerability],
                )
                .with_permission(Permission::ReadCode, false)
                .in_namespace(ROOT),
            )
            .await
            .unwrap();
        store
            .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(MEMBER_ROLE))
            .await
            .unwrap();
        store
            .add_project_member(USER, PROJECT, AccessLevel::Guest, Some(READ_CODE_ROLE))
            .await
            .unwrap();

        let roles = roles(&store);
        let mut cx = RequestContext::new();

        let result = roles
            .resolve_projects(&mut cx, &[PROJECT, OTHER_PROJECT], Some(&USER))
            .await
            .unwrap();
        assert_eq!(
            result[&PROJECT],
            set(&[Permission::ReadCode, Permission::ReadVulnerability])
        );
        assert_eq!(result[&OTHER_PROJECT], set(&[Permission::ReadVulnerability]));
    });
}

#[tokio::test]
async fn large_batches_resolve_in_sqlite() {
    setup_logging();

    let store = SqliteStore::temporary().await;
    hierarchy(&store).await;
    for id in 1..=10_000 {
        store.insert_project(ProjectId::new(id), SUBGROUP).await.unwrap();
    }
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();

    // Far more ids and chain pairs than SQLite accepts as separately bound variables.
    let projects: Vec<ProjectId> = (1..=40_000).map(ProjectId::new).collect();

    let roles = roles(&store);
    let result = roles
        .resolve_projects(&mut RequestContext::new(), &projects, Some(&USER))
        .await
        .unwrap();

    assert_eq!(result.len(), 40_000);
    assert_eq!(result.values().filter(|permissions| !permissions.is_empty()).count(), 10_000);
    assert_eq!(result[&ProjectId::new(1)], set(&[Permission::ReadCode]));
    assert_eq!(result[&ProjectId::new(10_000)], set(&[Permission::ReadCode]));
    assert_eq!(result[&ProjectId::new(40_000)], PermissionSet::new());
}

#[tokio::test]
async fn higher_link_role_overrides_member_role() {
    setup_logging();

    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        group_link(&store, AccessLevel::Developer, AccessLevel::Developer).await;

        let roles = roles(&store);
        let mut cx = RequestContext::new();

        let result = roles
            .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
            .await
            .unwrap();
        assert_eq!(result[&PROJECT], set(&[Permission::AdminMergeRequest]));

        let result = roles
            .resolve_groups(&mut cx, &[ROOT, SHARED_WITH], Some(&USER))
            .await
            .unwrap();
        assert_eq!(result[&ROOT], set(&[Permission::AdminMergeRequest]));

        // The member's own role applies in their own group.
        assert_eq!(result[&SHARED_WITH], set(&[Permission::ReadDependency]));
    });
}

#[tokio::test]
async fn equal_levels_keep_member_role() {
    setup_logging();

    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        group_link(&store, AccessLevel::Maintainer, AccessLevel::Maintainer).await;

        let roles = roles(&store);
        let mut cx = RequestContext::new();

        let result = roles
            .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
            .await
            .unwrap();
        assert_eq!(result[&PROJECT], set(&[Permission::ReadDependency]));
    });
}

#[tokio::test]
async fn link_without_override_caps_member_role() {
    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        store
            .insert_member_role(
                custom_role(
                    MEMBER_ROLE.as_i64(),
                    AccessLevel::Developer,
                    &[Permission::ReadDependency],
                )
                .in_namespace(SHARED_WITH),
            )
            .await
            .unwrap();
        store
            .insert_group_link(GroupLink::new(ROOT, SHARED_WITH, AccessLevel::Developer))
            .await
            .unwrap();
        store
            .add_namespace_member(USER, SHARED_WITH, AccessLevel::Developer, Some(MEMBER_ROLE))
            .await
            .unwrap();

        let roles = roles(&store);

        let mut cx = RequestContext::new();
        let result = roles.resolve_groups(&mut cx, &[ROOT], Some(&USER)).await.unwrap();
        assert_eq!(result[&ROOT], set(&[Permission::ReadDependency]));

        // Above the link's cap the member role is dropped.
        store
            .add_namespace_member(USER, SHARED_WITH, AccessLevel::Maintainer, Some(MEMBER_ROLE))
            .await
            .unwrap();
        let mut cx = RequestContext::new();
        let result = roles.resolve_groups(&mut cx, &[ROOT], Some(&USER)).await.unwrap();
        assert_eq!(result[&ROOT], PermissionSet::new());
    });
}

#[tokio::test]
async fn admin_role_as_link_override_grants_nothing() {
    assert_all_stores!(|store| async {
        hierarchy(&store).await;
        store
            .insert_member_role(
                MemberRole::admin(LINK_ROLE, "Support")
                    .with_permissions(&[Permission::ReadAdminUsers]),
            )
            .await
            .unwrap();
        store
            .insert_group_link(
                GroupLink::new(ROOT, SHARED_WITH, AccessLevel::Maintainer)
                    .with_member_role(LINK_ROLE),
            )
            .await
            .unwrap();
        store
            .add_namespace_member(USER, SHARED_WITH, AccessLevel::Guest, Some(READ_CODE_ROLE))
            .await
            .unwrap();

        let roles = roles(&store);
        let mut cx = RequestContext::new();
        let result = roles.resolve_groups(&mut cx, &[ROOT], Some(&USER)).await.unwrap();
        assert_eq!(result[&ROOT], PermissionSet::new());
    });
}

#[tokio::test]
async fn adding_roles_only_adds_permissions() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .add_namespace_member(USER, SUBGROUP, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();
    let roles = roles(&store);

    let before = roles
        .resolve_projects(&mut RequestContext::new(), &[PROJECT, OTHER_PROJECT], Some(&USER))
        .await
        .unwrap();

    store
        .add_project_member(USER, OTHER_PROJECT, AccessLevel::Guest, Some(VULNERABILITY_ROLE))
        .await
        .unwrap();

    let after = roles
        .resolve_projects(&mut RequestContext::new(), &[PROJECT, OTHER_PROJECT], Some(&USER))
        .await
        .unwrap();

    for project in [PROJECT, OTHER_PROJECT] {
        assert!(before[&project].is_subset(&after[&project]));
    }
    assert_eq!(before[&PROJECT], after[&PROJECT]);
    assert_eq!(
        after[&OTHER_PROJECT],
        set(&[Permission::ReadCode, Permission::ReadVulnerability])
    );
}

#[tokio::test]
async fn repeated_calls_are_served_from_cache() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();
    let roles = roles(&store);
    let mut cx = RequestContext::new();

    let first = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::AncestorChains(vec![10]),
            StoreCall::RoleSources(vec![10]),
        ]
    );

    store.reset_calls();
    let second = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert!(store.calls().is_empty());

    // Changes made during the request are not observed.
    store
        .add_project_member(USER, PROJECT, AccessLevel::Guest, Some(VULNERABILITY_ROLE))
        .await
        .unwrap();
    let third = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(first, third);

    // Groups and projects are cached separately.
    roles
        .resolve_groups(&mut cx, &[SUBGROUP], Some(&USER))
        .await
        .unwrap();
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::AncestorChains(vec![2]),
            StoreCall::RoleSources(vec![2]),
        ]
    );
}

#[tokio::test]
async fn only_missing_resources_are_queried() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();
    let roles = roles(&store);
    let mut cx = RequestContext::new();

    roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();

    store.reset_calls();
    let result = roles
        .resolve_projects(&mut cx, &[PROJECT, OTHER_PROJECT, OTHER_PROJECT], Some(&USER))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[&OTHER_PROJECT], set(&[Permission::ReadCode]));
    assert_eq!(store.role_source_queries(), 1);
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::AncestorChains(vec![11]),
            StoreCall::RoleSources(vec![11]),
        ]
    );
}

#[tokio::test]
async fn failed_batches_are_not_cached() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();
    let roles = roles(&store);
    let mut cx = RequestContext::new();

    store.fail_role_sources(true);
    let result = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await;
    assert_matches!(result, Err(ResolveError::Store(TestStoreError::Injected)));
    assert!(
        result
            .unwrap_err()
            .to_string()
            .starts_with("cannot determine custom role permissions")
    );

    store.fail_role_sources(false);
    store.reset_calls();
    let result = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result[&PROJECT], set(&[Permission::ReadCode]));
    assert_eq!(store.role_source_queries(), 1);
}

#[tokio::test]
async fn closed_gates_resolve_to_empty_sets() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Guest, Some(READ_CODE_ROLE))
        .await
        .unwrap();
    group_link(&store, AccessLevel::Developer, AccessLevel::Developer).await;

    // Unlicensed instance.
    let roles = MemberRoles::new(
        store.clone(),
        StaticGates::default().with_custom_roles(false),
        Config::default(),
    );
    let result = roles
        .resolve_projects(&mut RequestContext::new(), &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result, HashMap::from([(PROJECT, PermissionSet::new())]));
    assert_eq!(store.role_source_queries(), 0);

    // Without group links only the direct membership counts.
    let roles = MemberRoles::new(
        store.clone(),
        StaticGates::default().with_group_link_custom_roles(false),
        Config::default(),
    );
    let result = roles
        .resolve_projects(&mut RequestContext::new(), &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result[&PROJECT], set(&[Permission::ReadCode]));

    // Permissions behind a disabled rollout flag are dropped.
    let roles = MemberRoles::new(
        store.clone(),
        StaticGates::default().with_permission_flag(Permission::ReadCode, PermissionFlag::Disabled),
        Config::default(),
    );
    let result = roles
        .resolve_projects(&mut RequestContext::new(), &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result[&PROJECT], set(&[Permission::AdminMergeRequest]));
}

#[tokio::test]
async fn permissions_outside_catalog_scope_are_dropped() {
    let store = CountingStore::new(MemoryStore::new());
    hierarchy(&store).await;
    store
        .insert_member_role(custom_role(
            5,
            AccessLevel::Developer,
            &[Permission::ArchiveProject, Permission::AdminGroupMember],
        ))
        .await
        .unwrap();
    store
        .add_namespace_member(USER, ROOT, AccessLevel::Developer, Some(MemberRoleId::new(5)))
        .await
        .unwrap();
    let roles = roles(&store);
    let mut cx = RequestContext::new();

    let projects = roles
        .resolve_projects(&mut cx, &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(projects[&PROJECT], set(&[Permission::ArchiveProject]));

    let groups = roles.resolve_groups(&mut cx, &[ROOT], Some(&USER)).await.unwrap();
    assert_eq!(groups[&ROOT], set(&[Permission::AdminGroupMember]));
}

#[tokio::test]
async fn saas_skips_roots_without_member_roles() {
    let store = CountingStore::new(MemoryStore::new());
    store.insert_namespace(ROOT, None).await.unwrap();
    store.insert_project(PROJECT, ROOT).await.unwrap();

    // Instance-wide role, the root itself defines none.
    store
        .insert_member_role(custom_role(1, AccessLevel::Guest, &[Permission::ReadCode]))
        .await
        .unwrap();
    store
        .add_project_member(USER, PROJECT, AccessLevel::Guest, Some(MemberRoleId::new(1)))
        .await
        .unwrap();

    let saas = MemberRoles::new(
        store.clone(),
        StaticGates::default(),
        Config::new(Deployment::Saas),
    );
    let result = saas
        .resolve_projects(&mut RequestContext::new(), &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result[&PROJECT], PermissionSet::new());
    assert_eq!(store.role_source_queries(), 0);

    let self_managed = roles(&store);
    let result = self_managed
        .resolve_projects(&mut RequestContext::new(), &[PROJECT], Some(&USER))
        .await
        .unwrap();
    assert_eq!(result[&PROJECT], set(&[Permission::ReadCode]));
}

#[tokio::test]
async fn admin_permissions() {
    setup_logging();

    assert_all_stores!(|store| async {
        let role = MemberRole::admin(MemberRoleId::new(1), "Support")
            .with_permissions(&[Permission::ReadAdminUsers, Permission::ReadAdminDashboard])
            .with_permission(Permission::ReadAdminCicd, false)
            .with_permission(Permission::ReadCode, true);
        store.insert_member_role(role).await.unwrap();
        store
            .assign_admin_role(USER, MemberRoleId::new(1))
            .await
            .unwrap();

        let roles = roles(&store);
        let mut cx = RequestContext::new();

        let result = roles.resolve_admin(&mut cx, Some(&USER)).await.unwrap();
        assert_eq!(
            result,
            set(&[Permission::ReadAdminDashboard, Permission::ReadAdminUsers])
        );

        // Cached for the rest of the request.
        store.reset_calls();
        assert_eq!(roles.resolve_admin(&mut cx, Some(&USER)).await.unwrap(), result);
        assert!(store.calls().is_empty());

        // Users without an admin role.
        let result = roles
            .resolve_admin(&mut cx, Some(&UserId::new(2)))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(store.calls(), vec![StoreCall::AdminRole(2)]);
    });
}

#[tokio::test]
async fn admin_permissions_behind_gates() {
    let store = CountingStore::new(MemoryStore::new());
    store
        .insert_member_role(
            MemberRole::admin(MemberRoleId::new(1), "Support")
                .with_permissions(&[Permission::ReadAdminUsers, Permission::ReadAdminMonitoring]),
        )
        .await
        .unwrap();
    store
        .assign_admin_role(USER, MemberRoleId::new(1))
        .await
        .unwrap();

    for gates in [
        StaticGates::default().with_custom_admin_roles(false),
        StaticGates::default().with_custom_roles(false),
    ] {
        let roles = MemberRoles::new(store.clone(), gates, Config::default());
        let result = roles
            .resolve_admin(&mut RequestContext::new(), Some(&USER))
            .await
            .unwrap();
        assert!(result.is_empty());
    }
    assert!(store.calls().is_empty());

    let roles = MemberRoles::new(
        store.clone(),
        StaticGates::default().with_permission_flag(
            Permission::ReadAdminMonitoring,
            PermissionFlag::Actors(BTreeSet::from([UserId::new(2)])),
        ),
        Config::default(),
    );
    let result = roles
        .resolve_admin(&mut RequestContext::new(), Some(&USER))
        .await
        .unwrap();
    assert_eq!(result, set(&[Permission::ReadAdminUsers]));
}

#[tokio::test]
async fn every_resolution_emits_a_diagnostic_event() {
    let recorder = EventRecorder::new("resolving custom role permissions");
    let _guard = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(recorder.clone()),
    );

    let store = MemoryStore::new();
    hierarchy(&store).await;
    let roles = MemberRoles::new(
        store,
        StaticGates::default(),
        Config::default().with_diagnostic_sample_size(1),
    );
    let mut cx = RequestContext::new();

    roles
        .resolve_projects(&mut cx, &[PROJECT, OTHER_PROJECT], Some(&USER))
        .await
        .unwrap();
    roles.resolve_admin(&mut cx, Some(&USER)).await.unwrap();

    // Calls without a user don't resolve anything.
    roles.resolve_admin(&mut cx, None).await.unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0]["user_id"], "1");
    assert_eq!(events[0]["kind"], "\"project\"");
    assert_eq!(events[0]["resource_count"], "2");
    assert_eq!(events[0]["resource_ids_sample"], "[10]");

    assert_eq!(events[1]["user_id"], "1");
    assert_eq!(events[1]["kind"], "\"admin\"");
    assert_eq!(events[1]["resource_count"], "1");
    assert_eq!(events[1]["resource_ids_sample"], "[]");
}

#[tokio::test]
async fn saas_member_roles_belong_to_a_namespace() {
    assert_all_stores!(|store| async {
        store.insert_namespace(ROOT, None).await.unwrap();

        let role = custom_role(1, AccessLevel::Guest, &[Permission::ReadCode]);
        let result = store.create_member_role(role.clone(), Deployment::Saas).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            MemberRoleError::NamespaceRequired.to_string()
        );

        store
            .create_member_role(role.clone(), Deployment::SelfManaged)
            .await
            .unwrap();
        store
            .create_member_role(role.in_namespace(ROOT), Deployment::Saas)
            .await
            .unwrap();
    });
}
