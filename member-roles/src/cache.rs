// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-scoped memoization of resolved permissions.
//!
//! A [`RequestContext`] is created once per inbound request (or any other logical unit of work)
//! and handed by mutable reference to every resolution call made while serving it. Results
//! computed in earlier calls are served from it again, only ids which were never asked for are
//! computed, in one batch. Dropping the context discards everything, nothing is ever shared
//! between requests.
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::types::UserId;

/// Kind of resolution a cache partition holds results for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    Projects,
    Groups,
    Admin,
}

impl ResolutionKind {
    fn prefix(&self) -> &'static str {
        match self {
            ResolutionKind::Projects => "member_roles_in_projects",
            ResolutionKind::Groups => "member_roles_in_groups",
            ResolutionKind::Admin => "member_roles_for_admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ResolutionKind,
    user: UserId,
}

impl CacheKey {
    pub fn new(kind: ResolutionKind, user: UserId) -> Self {
        Self { kind, user }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:user:{}", self.kind.prefix(), self.user)
    }
}

/// Type-erased `id -> value` map of one cache key.
trait Entry: Send {
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K, V> Entry for HashMap<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Memoization store holding one typed `id -> value` map per cache key.
#[derive(Default)]
pub struct RequestCache {
    entries: HashMap<CacheKey, Box<dyn Entry>>,
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns values for exactly the requested ids.
    ///
    /// Ids already cached under this key are served as-is. All others are handed to `compute`
    /// in one batch, ids it doesn't return a value for are filled with `default`. New values
    /// are kept for later calls. When `compute` fails nothing is cached and the error is
    /// returned.
    pub async fn fetch<K, V, E, F>(
        &mut self,
        key: &CacheKey,
        requested: &[K],
        default: V,
        compute: F,
    ) -> Result<HashMap<K, V>, E>
    where
        K: Copy + Eq + Hash + Send + 'static,
        V: Clone + Send + 'static,
        F: AsyncFnOnce(Vec<K>) -> Result<HashMap<K, V>, E>,
    {
        let missing: Vec<K> = {
            let cached = self.entry_mut::<K, V>(key);
            let mut seen = HashSet::new();
            requested
                .iter()
                .filter(|id| !cached.contains_key(id) && seen.insert(**id))
                .copied()
                .collect()
        };

        if !missing.is_empty() {
            debug!(
                key = %key,
                requested = requested.len(),
                missing = missing.len(),
                "request cache miss"
            );

            let mut computed = compute(missing.clone()).await?;

            let cached = self.entry_mut::<K, V>(key);
            for id in missing {
                let value = computed.remove(&id).unwrap_or_else(|| default.clone());
                cached.insert(id, value);
            }
        }

        let cached = self.entry_mut::<K, V>(key);
        Ok(requested
            .iter()
            .map(|id| {
                let value = cached.get(id).cloned().unwrap_or_else(|| default.clone());
                (*id, value)
            })
            .collect())
    }

    /// Number of ids cached under a key.
    pub fn len(&self, key: &CacheKey) -> usize {
        self.entries
            .get(key)
            .map(|entry| entry.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry_mut<K, V>(&mut self, key: &CacheKey) -> &mut HashMap<K, V>
    where
        K: Send + 'static,
        V: Send + 'static,
    {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Box::new(HashMap::<K, V>::new()));

        if !entry.as_any().is::<HashMap<K, V>>() {
            warn!(key = %key, "cache key used with different entry types, discarding entry");
            *entry = Box::new(HashMap::<K, V>::new());
        }

        entry
            .as_any_mut()
            .downcast_mut::<HashMap<K, V>>()
            .expect("entry type was checked above")
    }
}

/// Handle for everything scoped to one logical request.
///
/// Construct it when a request starts and pass it to every resolution call.
#[derive(Debug, Default)]
pub struct RequestContext {
    cache: RequestCache,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut RequestCache {
        &mut self.cache
    }
}
