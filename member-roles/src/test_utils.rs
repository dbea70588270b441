// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::access::AccessLevel;
use crate::hierarchy::AncestorChain;
use crate::permission::Permission;
use crate::query::{RoleSourceQuery, RoleSourceRow};
use crate::traits::{RoleStore, WriteRoleStore};
use crate::types::{
    GroupLink, MemberRole, MemberRoleId, Membership, NamespaceId, ProjectId, Resource, UserId,
};

/// Installs a log subscriber when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Fields of a recorded log event, values formatted with `Debug`.
pub type EventFields = BTreeMap<String, String>;

/// Log layer keeping the fields of all events with the given message.
#[derive(Clone, Debug)]
pub struct EventRecorder {
    message: &'static str,
    events: Arc<Mutex<Vec<EventFields>>>,
}

impl EventRecorder {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<EventFields> {
        self.events.lock().expect("lock not poisoned").clone()
    }
}

struct FieldVisitor(EventFields);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for EventRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(EventFields::new());
        event.record(&mut visitor);

        if visitor.0.get("message").map(String::as_str) == Some(self.message) {
            self.events
                .lock()
                .expect("lock not poisoned")
                .push(visitor.0);
        }
    }
}

/// Regular custom role with all given permissions switched on.
pub fn custom_role(
    id: i64,
    base_access_level: AccessLevel,
    permissions: &[Permission],
) -> MemberRole {
    MemberRole::new(
        MemberRoleId::new(id),
        &format!("Custom role {id}"),
        base_access_level,
    )
    .with_permissions(permissions)
}

/// Read call recorded by [`CountingStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    AncestorChains(Vec<i64>),
    NamespacesWithMemberRoles(Vec<i64>),
    RoleSources(Vec<i64>),
    AdminRole(i64),
}

/// Store wrapper recording every read and optionally failing role-source queries.
///
/// Writes are passed through without being recorded.
#[derive(Clone, Debug)]
pub struct CountingStore<S> {
    inner: S,
    calls: Rc<RefCell<Vec<StoreCall>>>,
    fail_role_sources: Rc<Cell<bool>>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Rc::default(),
            fail_role_sources: Rc::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Number of role-source queries issued since the last reset.
    pub fn role_source_queries(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, StoreCall::RoleSources(_)))
            .count()
    }

    /// Makes all following role-source queries fail (or succeed again).
    pub fn fail_role_sources(&self, fail: bool) {
        self.fail_role_sources.set(fail);
    }

    fn record(&self, call: StoreCall) {
        self.calls.borrow_mut().push(call);
    }
}

#[derive(Debug, Error)]
pub enum TestStoreError<E>
where
    E: Error + 'static,
{
    #[error(transparent)]
    Inner(E),

    #[error("injected store failure")]
    Injected,
}

impl<S> RoleStore for CountingStore<S>
where
    S: RoleStore,
{
    type Error = TestStoreError<S::Error>;

    async fn ancestor_chains<R: Resource>(
        &self,
        resources: &[R],
    ) -> Result<BTreeMap<R, AncestorChain>, TestStoreError<S::Error>> {
        self.record(StoreCall::AncestorChains(
            resources.iter().map(Resource::id).collect(),
        ));
        self.inner
            .ancestor_chains(resources)
            .await
            .map_err(TestStoreError::Inner)
    }

    async fn namespaces_with_member_roles(
        &self,
        roots: &BTreeSet<NamespaceId>,
    ) -> Result<BTreeSet<NamespaceId>, TestStoreError<S::Error>> {
        self.record(StoreCall::NamespacesWithMemberRoles(
            roots.iter().map(NamespaceId::as_i64).collect(),
        ));
        self.inner
            .namespaces_with_member_roles(roots)
            .await
            .map_err(TestStoreError::Inner)
    }

    async fn role_sources<R: Resource>(
        &self,
        query: &RoleSourceQuery<R>,
    ) -> Result<Vec<RoleSourceRow<R>>, TestStoreError<S::Error>> {
        self.record(StoreCall::RoleSources(
            query.resources().map(|resource| resource.id()).collect(),
        ));

        if self.fail_role_sources.get() {
            return Err(TestStoreError::Injected);
        }

        self.inner
            .role_sources(query)
            .await
            .map_err(TestStoreError::Inner)
    }

    async fn admin_role(
        &self,
        user: &UserId,
    ) -> Result<Option<MemberRole>, TestStoreError<S::Error>> {
        self.record(StoreCall::AdminRole(user.as_i64()));
        self.inner
            .admin_role(user)
            .await
            .map_err(TestStoreError::Inner)
    }
}

impl<S> WriteRoleStore for CountingStore<S>
where
    S: WriteRoleStore,
{
    type Error = S::Error;

    async fn insert_namespace(
        &self,
        id: NamespaceId,
        parent: Option<NamespaceId>,
    ) -> Result<(), S::Error> {
        self.inner.insert_namespace(id, parent).await
    }

    async fn insert_project(
        &self,
        id: ProjectId,
        namespace: NamespaceId,
    ) -> Result<(), S::Error> {
        self.inner.insert_project(id, namespace).await
    }

    async fn insert_member_role(&self, role: MemberRole) -> Result<(), S::Error> {
        self.inner.insert_member_role(role).await
    }

    async fn insert_membership(
        &self,
        membership: Membership,
    ) -> Result<(), S::Error> {
        self.inner.insert_membership(membership).await
    }

    async fn insert_group_link(&self, link: GroupLink) -> Result<(), S::Error> {
        self.inner.insert_group_link(link).await
    }

    async fn assign_admin_role(
        &self,
        user: UserId,
        role: MemberRoleId,
    ) -> Result<(), S::Error> {
        self.inner.assign_admin_role(user, role).await
    }
}

/// Macro to run the same test logic against all store backend implementations.
///
/// The store is wrapped into a [`CountingStore`]:
/// - In-memory store (`MemoryStore`)
/// - SQLite store (`SqliteStore`)
#[macro_export]
macro_rules! assert_all_stores {
    (|$store:ident| $test_body:expr) => {
        // Test with MemoryStore.
        {
            let $store = $crate::test_utils::CountingStore::new(
                $crate::memory::MemoryStore::default(),
            );
            $test_body.await;
        }

        // Test with SqliteStore.
        {
            let $store = $crate::test_utils::CountingStore::new(
                $crate::sqlite::SqliteStore::temporary().await,
            );
            $test_body.await;
        }
    };
}
